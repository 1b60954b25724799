//! Session lifecycle: issuing, rotating and revoking access/refresh pairs.
//!
//! Every successful login-like operation ends in [`SessionManager::issue`],
//! which mints a short-lived access token and persists one new refresh
//! session. Refresh tokens are single use: redeeming one revokes it in the
//! same transaction that stores its replacement.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::Serialize;

use crate::auth::jwt::{generate_refresh_token, JwtManager};
use crate::auth::middleware::ClientContext;
use crate::auth::password::{hash_password_async, verify_password_async};
use crate::auth::providers::IdentityVerifier;
use crate::db::models::{RefreshToken, User};
use crate::db::pool::Db;
use crate::db::queries::refresh_tokens::{self, NewSession};
use crate::db::queries::users::{self, NewUser};
use crate::error::{AppError, AppResult};

/// Longest refresh session a configuration may ask for.
const MAX_REFRESH_TOKEN_EXPIRY_DAYS: i64 = 3650;

/// Session lifetime from configuration, pinned to 1..=3650 days.
fn refresh_token_lifetime(days: i64) -> Duration {
    Duration::days(days.clamp(1, MAX_REFRESH_TOKEN_EXPIRY_DAYS))
}

/// What the client receives after any successful authentication.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token, not of the refresh session.
    pub expires: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Db,
    jwt: JwtManager,
    verifier: Arc<dyn IdentityVerifier>,
    refresh_token_expiry: Duration,
}

impl SessionManager {
    pub fn new(
        db: Db,
        jwt: JwtManager,
        verifier: Arc<dyn IdentityVerifier>,
        refresh_token_expiry_days: i64,
    ) -> Self {
        Self {
            db,
            jwt,
            verifier,
            refresh_token_expiry: refresh_token_lifetime(refresh_token_expiry_days),
        }
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        ctx: &ClientContext,
    ) -> AppResult<TokenPair> {
        if users::email_exists(&self.db, email).await? {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password_async(password.to_string()).await?;
        let user = users::insert(
            &self.db,
            NewUser {
                name,
                email,
                password_hash: Some(password_hash),
                google_id: None,
            },
        )
        .await?;
        tracing::info!(user_id = %user.id, "Registered user");

        self.issue(&self.db, &user, ctx, Utc::now()).await
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &ClientContext,
    ) -> AppResult<TokenPair> {
        let user = users::find_by_email(&self.db, email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // Accounts created through Google have no password to check.
        let password_hash = user
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password_async(password.to_string(), password_hash).await? {
            tracing::info!(user_id = %user.id, "Rejected login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        self.issue(&self.db, &user, ctx, Utc::now()).await
    }

    /// Upserts the user behind a Google ID token. The provider is the source
    /// of truth for the display name on every login.
    ///
    /// An account already linked to the Google id wins over an email match.
    /// An email held only by a deactivated account is refused.
    pub async fn google_login(&self, google_token: &str, ctx: &ClientContext) -> AppResult<TokenPair> {
        let identity = self.verifier.verify(google_token).await.map_err(|e| {
            tracing::warn!(
                provider = self.verifier.provider_id(),
                error = %e,
                "External token rejected"
            );
            AppError::InvalidExternalToken
        })?;

        let user = if let Some(linked) =
            users::find_by_google_id(&self.db, &identity.external_id).await?
        {
            users::sync_external_identity(&self.db, linked, &identity.external_id, &identity.name)
                .await?
        } else if let Some(by_email) = users::find_by_email(&self.db, &identity.email).await? {
            let user = users::sync_external_identity(
                &self.db,
                by_email,
                &identity.external_id,
                &identity.name,
            )
            .await?;
            tracing::info!(user_id = %user.id, "Linked Google identity to existing user");
            user
        } else if users::email_in_use(&self.db, &identity.email).await? {
            tracing::warn!(
                provider = self.verifier.provider_id(),
                "Google login for an email held by a deactivated account"
            );
            return Err(AppError::InvalidExternalToken);
        } else {
            let user = users::insert(
                &self.db,
                NewUser {
                    name: &identity.name,
                    email: &identity.email,
                    password_hash: None,
                    google_id: Some(identity.external_id.clone()),
                },
            )
            .await?;
            tracing::info!(user_id = %user.id, "Created user from Google identity");
            user
        };

        self.issue(&self.db, &user, ctx, Utc::now()).await
    }

    /// Redeems a refresh token for a new pair.
    ///
    /// The old session is revoked with a conditional update inside the same
    /// transaction that inserts the replacement, so a concurrent second
    /// redemption of the same value finds nothing to revoke and fails.
    pub async fn refresh(&self, refresh_token: &str, ctx: &ClientContext) -> AppResult<TokenPair> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let Some(stored) = refresh_tokens::revoke_valid(&txn, refresh_token, now.naive_utc()).await?
        else {
            txn.rollback().await?;
            return Err(AppError::InvalidOrExpiredToken);
        };

        let user = users::find_by_id(&txn, &stored.user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let pair = self.issue(&txn, &user, ctx, now).await?;
        txn.commit().await?;

        tracing::debug!(user_id = %user.id, session_id = %stored.id, "Rotated refresh token");
        Ok(pair)
    }

    /// Returns `Ok(false)` when the token is unknown or already revoked.
    /// Storage failures are returned as errors.
    pub async fn revoke(&self, refresh_token: &str) -> AppResult<bool> {
        let revoked = refresh_tokens::revoke_by_token(&self.db, refresh_token).await?;
        if revoked {
            tracing::debug!("Revoked refresh token");
        }
        Ok(revoked)
    }

    /// Logs the user out everywhere. Returns how many sessions were revoked.
    pub async fn revoke_all(&self, user_id: &str) -> AppResult<u64> {
        let count = refresh_tokens::revoke_all_for_user(&self.db, user_id).await?;
        tracing::info!(user_id, count, "Revoked all sessions");
        Ok(count)
    }

    pub async fn active_sessions(&self, user_id: &str) -> AppResult<Vec<RefreshToken>> {
        refresh_tokens::list_active_by_user(&self.db, user_id, Utc::now().naive_utc()).await
    }

    pub async fn purge_expired(&self) -> AppResult<u64> {
        refresh_tokens::delete_expired(&self.db, Utc::now().naive_utc()).await
    }

    async fn issue<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &User,
        ctx: &ClientContext,
        now: DateTime<Utc>,
    ) -> AppResult<TokenPair> {
        let access = self.jwt.issue_access_token_at(user, now)?;
        let refresh_token = generate_refresh_token();

        refresh_tokens::insert(
            db,
            NewSession {
                user_id: &user.id,
                token: &refresh_token,
                device_info: Some(ctx.device_info.clone()),
                ip_address: Some(ctx.ip_address.clone()),
                expires_at: (now + self.refresh_token_expiry).naive_utc(),
            },
        )
        .await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token,
            expires: access.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_lifetime_is_clamped() {
        assert_eq!(refresh_token_lifetime(7), Duration::days(7));
        assert_eq!(refresh_token_lifetime(0), Duration::days(1));
        assert_eq!(refresh_token_lifetime(-5), Duration::days(1));
        assert_eq!(
            refresh_token_lifetime(i64::MAX),
            Duration::days(MAX_REFRESH_TOKEN_EXPIRY_DAYS)
        );
    }
}
