//! Brute-force login throttling
//!
//! Throttling keys on the submitted username, whether or not such a user
//! exists, over a sliding window recomputed at every decision. Once a
//! username is locked, one more try becomes possible each time its oldest
//! failure ages out of the window.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::info;

use crate::error::StoreResult;
use crate::ledger::LoginLedger;

/// Throttle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ThrottleConfig {
    /// Failures within the window that trigger a lockout
    pub max_attempts: u32,
    /// Sliding window length in seconds
    pub window_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 900, // 15 minutes
        }
    }
}

impl ThrottleConfig {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::seconds(i64::try_from(self.window_seconds).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allow,
    Lockout,
}

/// Decide from a failure count alone
pub fn evaluate(config: &ThrottleConfig, failures: u32) -> ThrottleDecision {
    if failures >= config.max_attempts {
        ThrottleDecision::Lockout
    } else {
        ThrottleDecision::Allow
    }
}

/// Throttle policy backed by the login ledger
#[derive(Clone)]
pub struct ThrottlePolicy {
    config: ThrottleConfig,
    ledger: LoginLedger,
}

impl ThrottlePolicy {
    pub fn new(config: ThrottleConfig, ledger: LoginLedger) -> Self {
        Self { config, ledger }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Count failures in `[now - window, now]` and decide
    pub async fn decide(&self, username: &str, now: DateTime<Utc>) -> StoreResult<ThrottleDecision> {
        let since = now - self.config.window();
        let failures = self.ledger.count_failures(username, since).await?;
        let decision = evaluate(&self.config, failures);

        if decision == ThrottleDecision::Lockout {
            info!(
                "Login throttled for {}: {} failures in the last {}s",
                username, failures, self.config.window_seconds
            );
        }
        Ok(decision)
    }
}
