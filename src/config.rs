use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_access_token_expiry_secs: i64,
    pub jwt_refresh_token_expiry_days: i64,
    pub google_tokeninfo_url: String,
    /// When set, Google ID tokens must carry this value as `aud`.
    pub google_client_id: Option<String>,
    pub google_timeout_secs: u64,
    pub token_cleanup_interval_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "tunelist-service".to_string()),
            jwt_audience: env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "tunelist-client".to_string()),
            jwt_access_token_expiry_secs: env::var("JWT_ACCESS_TOKEN_EXPIRY_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
            jwt_refresh_token_expiry_days: env::var("JWT_REFRESH_TOKEN_EXPIRY_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            google_tokeninfo_url: env::var("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".to_string()),
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .ok()
                .filter(|id| !id.trim().is_empty()),
            google_timeout_secs: env::var("GOOGLE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            token_cleanup_interval_secs: env::var("TOKEN_CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string()),
        })
    }

    pub fn google_timeout(&self) -> Duration {
        Duration::from_secs(self.google_timeout_secs)
    }

    /// Never zero; a zero period would stop the cleanup job at start.
    pub fn token_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.token_cleanup_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token_cleanup_interval_secs: u64) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "x".repeat(32),
            jwt_issuer: "issuer".to_string(),
            jwt_audience: "audience".to_string(),
            jwt_access_token_expiry_secs: 3600,
            jwt_refresh_token_expiry_days: 7,
            google_tokeninfo_url: "http://127.0.0.1:9/tokeninfo".to_string(),
            google_client_id: None,
            google_timeout_secs: 10,
            token_cleanup_interval_secs,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[test]
    fn cleanup_interval_is_never_zero() {
        assert_eq!(config(0).token_cleanup_interval(), Duration::from_secs(1));
        assert_eq!(config(3600).token_cleanup_interval(), Duration::from_secs(3600));
    }
}
