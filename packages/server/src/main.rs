use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::storage::filesystem::FilesystemBlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ctf_server::config::AppConfig;
use ctf_server::state::AppState;
use ctf_server::utils::rate_limit::FixedWindowLimiter;
use ctf_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = database::init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_indexes(&db).await?;

    let blob_store = FilesystemBlobStore::new(
        config.storage.blob_dir.clone(),
        config.storage.max_blob_size,
    )
    .await
    .context("Failed to open blob store")?;

    let window = Duration::from_secs(config.signup.rate_limit_window_secs);
    let signup_limiter = Arc::new(FixedWindowLimiter::new(
        config.signup.rate_limit_max,
        window,
    ));
    {
        let limiter = signup_limiter.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(window);
            loop {
                tick.tick().await;
                limiter.prune();
            }
        });
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        blob_store: Arc::new(blob_store),
        signup_limiter,
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
