#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database};
use tower::ServiceExt;
use tunelist_service::auth::providers::{ExternalIdentity, IdentityVerifier, VerifyError};
use tunelist_service::config::Config;
use tunelist_service::routes::create_router;
use tunelist_service::AppState;

pub const TEST_SECRET: &str = "test-secret-0123456789-abcdefghijklmnop";
pub const USER_AGENT: &str = "tunelist-tests/1.0";

// ─── TestResponse ────────────────────────────────────────────────────────────

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body_bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response as {}: {e}\nBody: {}",
                std::any::type_name::<T>(),
                self.text()
            )
        })
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {expected}, got {}. Body: {}",
            self.status,
            self.text()
        );
    }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl Tokens {
    pub fn from_response(resp: &TestResponse) -> Self {
        resp.assert_status(StatusCode::OK);
        let json: serde_json::Value = resp.json();
        Self {
            access_token: json["accessToken"].as_str().unwrap().to_string(),
            refresh_token: json["refreshToken"].as_str().unwrap().to_string(),
        }
    }
}

// ─── StubVerifier ────────────────────────────────────────────────────────────

/// Accepts only the assertions it was seeded with.
#[derive(Default)]
pub struct StubVerifier {
    identities: HashMap<String, ExternalIdentity>,
}

impl StubVerifier {
    pub fn with(mut self, assertion: &str, external_id: &str, email: &str, name: &str) -> Self {
        self.identities.insert(
            assertion.to_string(),
            ExternalIdentity {
                external_id: external_id.to_string(),
                email: email.to_string(),
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    fn provider_id(&self) -> &str {
        "stub"
    }

    async fn verify(&self, assertion: &str) -> Result<ExternalIdentity, VerifyError> {
        self.identities
            .get(assertion)
            .cloned()
            .ok_or(VerifyError::VerificationFailed(reqwest::StatusCode::BAD_REQUEST))
    }
}

// ─── TestApp ─────────────────────────────────────────────────────────────────

pub struct TestApp {
    router: Router,
    pub state: AppState,
    db_file: Option<PathBuf>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_issuer: "tunelist-test".to_string(),
        jwt_audience: "tunelist-test-client".to_string(),
        jwt_access_token_expiry_secs: 3600,
        jwt_refresh_token_expiry_days: 7,
        google_tokeninfo_url: "http://127.0.0.1:9/tokeninfo".to_string(),
        google_client_id: None,
        google_timeout_secs: 5,
        token_cleanup_interval_secs: 3600,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_allowed_origins: "*".to_string(),
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_verifier(StubVerifier::default()).await
    }

    pub async fn with_verifier(verifier: StubVerifier) -> Self {
        // One connection: every pooled connection to `:memory:` would be a
        // separate database.
        let mut options = ConnectOptions::new(test_config().database_url);
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        Self::build(options, verifier, None).await
    }

    /// A throwaway SQLite file behind a pool of several connections, so
    /// concurrent transactions really run side by side.
    pub async fn with_file_db() -> Self {
        let path = std::env::temp_dir().join(format!("tunelist-{}.db", uuid::Uuid::new_v4()));
        let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
        options
            .max_connections(4)
            .min_connections(4)
            .sqlx_logging(false);
        Self::build(options, StubVerifier::default(), Some(path)).await
    }

    async fn build(options: ConnectOptions, verifier: StubVerifier, db_file: Option<PathBuf>) -> Self {
        let mut config = test_config();
        config.database_url = options.get_url().to_string();

        let db = Database::connect(options)
            .await
            .expect("Failed to connect to test SQLite");

        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let state =
            AppState::new(db, config, Arc::new(verifier)).expect("Failed to build app state");

        let router = create_router(state.clone());

        Self {
            router,
            state,
            db_file,
        }
    }

    pub async fn request(&self, req: Request<Body>) -> TestResponse {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot failed");

        let status = resp.status();
        let body_bytes = resp
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    // ── Request helpers ──────────────────────────────────────────────────

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        bearer: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = bearer {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let req = builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.request(req).await
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
        bearer: &str,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {bearer}"));
        let req = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(req).await
    }

    pub async fn get(&self, uri: &str, bearer: &str) -> TestResponse {
        self.send("GET", uri, None, bearer).await
    }

    // ── Auth helpers ─────────────────────────────────────────────────────

    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({
            "name": name,
            "email": email,
            "password": password,
        });
        self.post_json("/auth/register", body, None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });
        self.post_json("/auth/login", body, None).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> TestResponse {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        self.post_json("/auth/refresh-token", body, None).await
    }

    pub async fn google_login(&self, google_token: &str) -> TestResponse {
        let body = serde_json::json!({ "googleToken": google_token });
        self.post_json("/auth/google-login", body, None).await
    }

    /// Registers a user and returns the issued pair.
    pub async fn signed_up(&self, name: &str, email: &str) -> Tokens {
        Tokens::from_response(&self.register(name, email, "secret123").await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(path) = &self.db_file {
            for suffix in ["", "-wal", "-shm", "-journal"] {
                let mut file = path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }
}
