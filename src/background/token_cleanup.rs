//! Periodic purge of refresh sessions whose `expires_at` has passed.
//!
//! Expired rows are already rejected by rotation and listing, so this only
//! keeps the table small. Revoked but unexpired rows are kept until they
//! expire.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::auth::session::SessionManager;

pub async fn run(sessions: SessionManager, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Token cleanup job started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Token cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match sessions.purge_expired().await {
                    Ok(0) => tracing::debug!("Token cleanup: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Token cleanup: purged expired sessions"),
                    Err(e) => tracing::error!(error = %e, "Token cleanup failed"),
                }
            }
        }
    }
}
