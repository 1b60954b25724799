pub mod auth;
pub mod background;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use db::pool::Db;

use auth::jwt::JwtManager;
use auth::providers::IdentityVerifier;
use auth::session::SessionManager;
use config::Config;
use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub jwt: JwtManager,
    pub sessions: SessionManager,
    pub config: Config,
}

impl AppState {
    /// Wires the token codec and session manager around one connection
    /// pool. The verifier is injected so tests can stand in for Google.
    pub fn new(
        db: Db,
        config: Config,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Result<Self, AppError> {
        let jwt = JwtManager::new(&config)?;
        let sessions = SessionManager::new(
            db.clone(),
            jwt.clone(),
            verifier,
            config.jwt_refresh_token_expiry_days,
        );

        Ok(Self {
            db,
            jwt,
            sessions,
            config,
        })
    }
}

impl AsRef<AppState> for AppState {
    fn as_ref(&self) -> &AppState {
        self
    }
}
