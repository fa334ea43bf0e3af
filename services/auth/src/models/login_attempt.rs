//! Login attempt ledger entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One authentication attempt, recorded against the username as typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub username: String,
    pub origin: String,
    pub success: bool,
    pub attempted_at: DateTime<Utc>,
}
