//! Login attempt ledger

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::StoreResult;
use crate::models::LoginAttempt;
use crate::repositories::LoginAttemptRepository;

/// Append-only record of login attempts, keyed by the username as typed
#[derive(Clone)]
pub struct LoginLedger {
    repository: Arc<dyn LoginAttemptRepository>,
}

impl LoginLedger {
    pub fn new(repository: Arc<dyn LoginAttemptRepository>) -> Self {
        Self { repository }
    }

    /// Append an attempt. Best-effort: one retry, then the fault is logged
    /// and dropped so the login flow carries on.
    pub async fn record(&self, username: &str, success: bool, origin: &str, at: DateTime<Utc>) {
        let attempt = LoginAttempt {
            username: username.to_string(),
            origin: origin.to_string(),
            success,
            attempted_at: at,
        };

        if let Err(first) = self.repository.record(&attempt).await {
            warn!("Login attempt write failed, retrying: {}", first);
            if let Err(second) = self.repository.record(&attempt).await {
                error!(
                    "Dropped login attempt for {} (success={}): {}",
                    username, success, second
                );
            }
        }
    }

    /// Failed attempts for `username` at or after `since`
    pub async fn count_failures(&self, username: &str, since: DateTime<Utc>) -> StoreResult<u32> {
        self.repository.count_failures_since(username, since).await
    }
}
