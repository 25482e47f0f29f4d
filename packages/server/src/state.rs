use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::utils::rate_limit::FixedWindowLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub blob_store: Arc<dyn BlobStore>,
    /// Per-address signup throttle. Process-local: counters are not shared between
    /// instances and reset on restart.
    pub signup_limiter: Arc<FixedWindowLimiter>,
}
