use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use tempfile::TempDir;

use ::common::storage::BlobStore;
use ::common::storage::filesystem::FilesystemBlobStore;
use ctf_server::config::{
    AppConfig, AuthConfig, CorsConfig, DatabaseConfig, LeaderboardConfig, ServerConfig,
    SignupConfig, StorageConfig,
};
use ctf_server::entity::user;
use ctf_server::state::AppState;
use ctf_server::utils::rate_limit::FixedWindowLimiter;

pub const PASSWORD: &str = "correct-horse";

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";

    pub const EVENTS: &str = "/api/v1/events";
    pub const CURRENT_EVENT: &str = "/api/v1/events/current";

    pub fn event(id: i32) -> String {
        format!("/api/v1/events/{id}")
    }

    pub fn event_teams(id: i32) -> String {
        format!("/api/v1/events/{id}/teams")
    }

    pub fn event_cleanup(id: i32) -> String {
        format!("/api/v1/events/{id}/cleanup")
    }

    pub const TEAMS: &str = "/api/v1/teams";
    pub const JOIN_TEAM: &str = "/api/v1/teams/join";
    pub const MY_TEAM: &str = "/api/v1/teams/me";

    pub fn team(id: i32) -> String {
        format!("/api/v1/teams/{id}")
    }

    pub fn team_ban(id: i32) -> String {
        format!("/api/v1/teams/{id}/ban")
    }

    pub fn team_rotate_invite(id: i32) -> String {
        format!("/api/v1/teams/{id}/rotate-invite")
    }

    pub const CHALLENGES: &str = "/api/v1/challenges";

    pub fn challenge(id: i32) -> String {
        format!("/api/v1/challenges/{id}")
    }

    pub fn submit(id: i32) -> String {
        format!("/api/v1/challenges/{id}/submit")
    }

    pub const ADMIN_CHALLENGES: &str = "/api/v1/admin/challenges";

    pub fn admin_challenge(id: i32) -> String {
        format!("/api/v1/admin/challenges/{id}")
    }

    pub fn admin_challenge_files(id: i32) -> String {
        format!("/api/v1/admin/challenges/{id}/files")
    }

    pub fn admin_challenge_file(id: i32, file_id: &str) -> String {
        format!("/api/v1/admin/challenges/{id}/files/{file_id}")
    }

    pub fn file(file_id: &str) -> String {
        format!("/api/v1/files/{file_id}")
    }

    pub const PRACTICE: &str = "/api/v1/practice/challenges";

    pub fn practice_submit(id: i32) -> String {
        format!("/api/v1/practice/challenges/{id}/submit")
    }

    pub fn practice_hint(id: i32) -> String {
        format!("/api/v1/practice/challenges/{id}/hint")
    }

    pub fn admin_user(id: i32) -> String {
        format!("/api/v1/admin/users/{id}")
    }

    pub const LEADERBOARD_INDIVIDUAL: &str = "/api/v1/leaderboard/individual";
    pub const LEADERBOARD_TEAMS: &str = "/api/v1/leaderboard/teams";
}

/// A running test server backed by an in-memory SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub blob_store: Arc<dyn BlobStore>,
    _blobs: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a config tweak applied before the server starts.
    pub async fn spawn_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let blobs = tempfile::tempdir().expect("Failed to create blob dir");

        let mut app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                // A second connection would open a separate empty in-memory database.
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                token_ttl_days: 1,
                email_domain: None,
            },
            storage: StorageConfig {
                blob_dir: blobs.path().join("blobs"),
                max_blob_size: 1024 * 1024,
            },
            signup: SignupConfig {
                rate_limit_max: 1000,
                rate_limit_window_secs: 60,
            },
            leaderboard: LeaderboardConfig::default(),
        };
        tweak(&mut app_config);

        let db = ctf_server::database::init_db(&app_config.database)
            .await
            .expect("Failed to initialize test database");
        ctf_server::seed::seed_role_permissions(&db)
            .await
            .expect("Failed to seed roles");
        ctf_server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let blob_store = FilesystemBlobStore::new(
            app_config.storage.blob_dir.clone(),
            app_config.storage.max_blob_size,
        )
        .await
        .expect("Failed to open blob store");

        let signup_limiter = Arc::new(FixedWindowLimiter::new(
            app_config.signup.rate_limit_max,
            Duration::from_secs(app_config.signup.rate_limit_window_secs),
        ));

        let blob_store: Arc<dyn BlobStore> = Arc::new(blob_store);
        let state = AppState {
            db: db.clone(),
            config: app_config,
            blob_store: blob_store.clone(),
            signup_limiter,
        };

        let app = ctf_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            blob_store,
            _blobs: blobs,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_from_address(&self, path: &str, body: &Value, addr: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("X-Forwarded-For", addr)
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(
        &self,
        path: &str,
        file_name: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        self.upload_many_with_token(path, vec![(file_name, file_bytes)], token)
            .await
    }

    /// Upload several `files` parts in one request, in order.
    pub async fn upload_many_with_token(
        &self,
        path: &str,
        files: Vec<(&str, Vec<u8>)>,
        token: &str,
    ) -> TestResponse {
        let mut form = reqwest::multipart::Form::new();
        for (file_name, file_bytes) in files {
            let part =
                reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
            form = form.part("files", part);
        }

        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    /// Raw download, returning status and body bytes.
    pub async fn download_with_token(&self, path: &str, token: &str) -> (u16, Vec<u8>) {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");
        let status = res.status().as_u16();
        let bytes = res.bytes().await.unwrap_or_default().to_vec();
        (status, bytes)
    }

    pub fn register_body(username: &str) -> Value {
        json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": PASSWORD,
            "confirm_password": PASSWORD,
        })
    }

    /// Register a player and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str) -> String {
        let reg = self
            .post_without_token(routes::REGISTER, &Self::register_body(username))
            .await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        self.login(username).await
    }

    pub async fn login(&self, username: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &json!({"username": username, "password": PASSWORD}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Register a user, move them to `role`, then log in and return the auth token.
    pub async fn create_user_with_role(&self, username: &str, role: &str) -> String {
        let reg = self
            .post_without_token(routes::REGISTER, &Self::register_body(username))
            .await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        let db_user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found after registration");

        let mut active: user::ActiveModel = db_user.into();
        active.role = Set(role.to_string());
        user::Entity::update(active)
            .exec(&self.db)
            .await
            .expect("Failed to update user role");

        self.login(username).await
    }

    /// The `id` behind a token.
    pub async fn user_id(&self, token: &str) -> i32 {
        let res = self.get_with_token(routes::ME, token).await;
        assert_eq!(res.status, 200, "me failed: {}", res.text);
        res.id()
    }

    pub async fn create_admin(&self) -> String {
        self.create_user_with_role("admin", "admin").await
    }

    /// Create an event via the API and return its `id`.
    pub async fn create_event(
        &self,
        token: &str,
        name: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> i32 {
        let res = self
            .post_with_token(
                routes::EVENTS,
                &json!({"name": name, "starts_at": starts_at, "ends_at": ends_at}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_event failed: {}", res.text);
        res.id()
    }

    /// Create a running event spanning an hour either side of now.
    pub async fn create_running_event(&self, token: &str) -> i32 {
        let now = Utc::now();
        self.create_event(
            token,
            "Running CTF",
            now - chrono::Duration::hours(1),
            now + chrono::Duration::hours(1),
        )
        .await
    }

    /// Create a challenge via the API and return its `id`.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_challenge(
        &self,
        token: &str,
        event_id: i32,
        title: &str,
        points: i32,
        flag: &str,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> i32 {
        let res = self
            .post_with_token(
                routes::ADMIN_CHALLENGES,
                &json!({
                    "event_id": event_id,
                    "title": title,
                    "category": "Web Exploitation",
                    "description": "Find the flag.",
                    "points": points,
                    "flag": flag,
                    "starts_at": starts_at,
                    "ends_at": ends_at,
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_challenge failed: {}", res.text);
        res.id()
    }

    /// The `(starts_at, ends_at)` window of an event.
    pub async fn event_window(&self, token: &str, event_id: i32) -> (DateTime<Utc>, DateTime<Utc>) {
        let res = self.get_with_token(&routes::event(event_id), token).await;
        assert_eq!(res.status, 200, "get_event failed: {}", res.text);
        let parse = |v: &Value| serde_json::from_value(v.clone()).expect("timestamp");
        (parse(&res.body["starts_at"]), parse(&res.body["ends_at"]))
    }

    /// Create a challenge open for the whole window of `event_id`.
    pub async fn create_open_challenge(
        &self,
        token: &str,
        event_id: i32,
        title: &str,
        points: i32,
        flag: &str,
    ) -> i32 {
        let (starts_at, ends_at) = self.event_window(token, event_id).await;
        self.create_challenge(token, event_id, title, points, flag, starts_at, ends_at)
            .await
    }

    /// Create a team for the current event and return `(team_id, invite_token)`.
    pub async fn create_team(&self, token: &str, name: &str) -> (i32, String) {
        let res = self
            .post_with_token(
                routes::TEAMS,
                &json!({"name": name, "password": "teampass"}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_team failed: {}", res.text);
        let team = &res.body["team"];
        (
            team["id"].as_i64().expect("team id") as i32,
            team["invite_token"]
                .as_str()
                .expect("invite token")
                .to_string(),
        )
    }

    pub async fn join_team(&self, token: &str, invite_token: &str) -> TestResponse {
        self.post_with_token(
            routes::JOIN_TEAM,
            &json!({"invite_token": invite_token}),
            token,
        )
        .await
    }

    pub async fn submit_flag(&self, token: &str, challenge_id: i32, flag: &str) -> TestResponse {
        self.post_with_token(&routes::submit(challenge_id), &json!({"flag": flag}), token)
            .await
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}
