//! Session model and related functionality

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// Authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque random identifier carried by the session cookie
    pub id: String,
    pub user_id: UserId,
    /// Role at login time. Authorization re-reads the user instead of trusting this.
    pub role: Role,
    /// Anti-forgery token bound to this session
    pub csrf_token: String,
    /// Client address the session was opened from
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Time since the last authenticated request, clamped at zero
    pub fn idle_for(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.last_activity).max(TimeDelta::zero())
    }

    /// Short identifier prefix for log lines
    pub fn log_id(&self) -> &str {
        log_prefix(&self.id)
    }
}

/// First characters of a session id, enough to correlate log lines
pub fn log_prefix(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(8)
        .map(|(idx, _)| idx)
        .unwrap_or(id.len());
    &id[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(last_activity: DateTime<Utc>) -> Session {
        Session {
            id: "abcdefghijklmnop".to_string(),
            user_id: 1,
            role: Role::Student,
            csrf_token: "token".to_string(),
            origin: None,
            created_at: last_activity,
            last_activity,
        }
    }

    #[test]
    fn test_idle_for_clamps_clock_skew() {
        let t0 = DateTime::from_timestamp(1_000, 0).unwrap();
        let session = session_at(t0);
        assert_eq!(session.idle_for(t0 + TimeDelta::seconds(30)).num_seconds(), 30);
        assert_eq!(session.idle_for(t0 - TimeDelta::seconds(30)), TimeDelta::zero());
    }

    #[test]
    fn test_log_prefix_truncates() {
        assert_eq!(log_prefix("abcdefghijklmnop"), "abcdefgh");
        assert_eq!(log_prefix("abc"), "abc");
    }
}
