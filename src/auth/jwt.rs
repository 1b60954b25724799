use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::db::models::User;
use crate::error::AppError;

/// HS256 keys shorter than the digest size are rejected at startup.
const MIN_SECRET_LEN: usize = 32;
/// Configured lifetimes are pinned to this so `iat + lifetime` stays a
/// representable timestamp.
const MAX_ACCESS_TOKEN_EXPIRY_SECS: i64 = 365 * 24 * 60 * 60;

const REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // user ID
    pub name: String,
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("issuer or audience mismatch")]
    InvalidClaims,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            // A token signed with any other algorithm is treated like a bad MAC.
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => TokenError::InvalidClaims,
            _ => TokenError::Malformed,
        }
    }
}

/// A freshly signed access token and the instant it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_expiry_secs: i64,
}

impl JwtManager {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Self::from_secret(
            config.jwt_secret.as_bytes(),
            &config.jwt_issuer,
            &config.jwt_audience,
            config.jwt_access_token_expiry_secs,
        )
    }

    pub fn from_secret(
        secret: &[u8],
        issuer: &str,
        audience: &str,
        access_token_expiry_secs: i64,
    ) -> Result<Self, AppError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Internal(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            access_token_expiry_secs: access_token_expiry_secs.clamp(1, MAX_ACCESS_TOKEN_EXPIRY_SECS),
        })
    }

    pub fn issue_access_token(&self, user: &User) -> Result<IssuedToken, AppError> {
        self.issue_access_token_at(user, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AppError> {
        let iat = now.timestamp();
        let exp = iat + self.access_token_expiry_secs;
        let claims = Claims {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat,
            exp,
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {e}")))?;
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AppError::Internal(format!("Access token expiry out of range: {exp}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_access_token_at(token, Utc::now().timestamp())
    }

    /// Checks signature, issuer and audience, then rejects the token once
    /// `now` reaches `exp`.
    pub fn verify_access_token_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "iss", "aud", "exp", "iat"]);
        // Expiry is compared below against the caller's clock, without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        if now >= token_data.claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(token_data.claims)
    }
}

/// Generate a cryptographically random refresh token.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Hash a token with SHA-256 for storage.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn manager() -> JwtManager {
        JwtManager::from_secret(SECRET, "issuer-test", "audience-test", 3600).unwrap()
    }

    fn user() -> User {
        let now = Utc::now().naive_utc();
        User {
            id: "6f1c2a9e-0000-4000-8000-000000000001".to_string(),
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: None,
            google_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn configured_lifetime_is_clamped() {
        let now = Utc::now();
        let long = JwtManager::from_secret(SECRET, "issuer-test", "audience-test", i64::MAX).unwrap();
        let issued = long.issue_access_token_at(&user(), now).unwrap();
        assert_eq!(
            issued.expires_at.timestamp(),
            now.timestamp() + MAX_ACCESS_TOKEN_EXPIRY_SECS
        );

        let zero = JwtManager::from_secret(SECRET, "issuer-test", "audience-test", 0).unwrap();
        let issued = zero.issue_access_token_at(&user(), now).unwrap();
        assert_eq!(issued.expires_at.timestamp(), now.timestamp() + 1);
    }

    #[test]
    fn issued_token_carries_identity_claims() {
        let jwt = manager();
        let now = Utc::now();
        let issued = jwt.issue_access_token_at(&user(), now).unwrap();

        let claims = jwt.verify_access_token(&issued.token).unwrap();
        assert_eq!(claims.sub, user().id);
        assert_eq!(claims.name, "Ann");
        assert_eq!(claims.email, "ann@x.com");
        assert_eq!(claims.iss, "issuer-test");
        assert_eq!(claims.aud, "audience-test");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(issued.expires_at.timestamp(), claims.exp);
    }

    #[test]
    fn minting_is_deterministic_for_same_clock() {
        let jwt = manager();
        let now = Utc::now();
        let a = jwt.issue_access_token_at(&user(), now).unwrap();
        let b = jwt.issue_access_token_at(&user(), now).unwrap();
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn expiry_boundary() {
        let jwt = manager();
        let issued = jwt.issue_access_token_at(&user(), Utc::now()).unwrap();
        let exp = issued.expires_at.timestamp();

        assert!(jwt.verify_access_token_at(&issued.token, exp - 1).is_ok());
        assert_eq!(
            jwt.verify_access_token_at(&issued.token, exp),
            Err(TokenError::Expired)
        );
        assert_eq!(
            jwt.verify_access_token_at(&issued.token, exp + 1),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn rejects_token_from_other_key() {
        let other =
            JwtManager::from_secret(b"ffffffffffffffffffffffffffffffff", "issuer-test", "audience-test", 3600)
                .unwrap();
        let issued = other.issue_access_token(&user()).unwrap();

        assert_eq!(
            manager().verify_access_token(&issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_other_algorithm_with_same_secret() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user().id,
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            iss: "issuer-test".to_string(),
            aud: "audience-test".to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(
            manager().verify_access_token(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_wrong_audience() {
        let other = JwtManager::from_secret(SECRET, "issuer-test", "someone-else", 3600).unwrap();
        let issued = other.issue_access_token(&user()).unwrap();

        assert_eq!(
            manager().verify_access_token(&issued.token),
            Err(TokenError::InvalidClaims)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            manager().verify_access_token("not-a-jwt"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn short_secret_is_refused() {
        assert!(JwtManager::from_secret(b"short", "i", "a", 3600).is_err());
    }

    #[test]
    fn refresh_tokens_are_long_and_distinct() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        let decoded = base64::engine::general_purpose::STANDARD.decode(&a).unwrap();
        assert_eq!(decoded.len(), REFRESH_TOKEN_BYTES);
        assert_eq!(hash_token(&a).len(), 64);
        assert_eq!(hash_token(&a), hash_token(&a));
    }
}
