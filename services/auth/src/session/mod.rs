//! Session lifecycle
//!
//! Sessions move from created (Active) to Expired once they idle past the
//! timeout, and are destroyed on logout, on expiry detection, or when the
//! owning account is deactivated. Expiry is detected lazily on the next
//! access; the janitor only reclaims storage.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::crypto::{TOKEN_LENGTH, random_token};
use crate::csrf::CsrfGuard;
use crate::error::StoreResult;
use crate::models::{Role, Session, UserId, session::log_prefix};

pub mod postgres;
pub mod redis;
pub mod store;

pub use postgres::PgSessionStore;
pub use redis::RedisSessionStore;
pub use store::{MemorySessionStore, SessionStore};

/// Result of validating a session identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Within the idle timeout; `last_activity` has been refreshed
    Active(Session),
    /// Idled past the timeout; the session has been destroyed. Carries the
    /// last stored state.
    Expired(Session),
    NotFound,
}

/// Creates, validates and destroys sessions
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    csrf: CsrfGuard,
    idle_timeout: TimeDelta,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, idle_timeout_seconds: u64) -> Self {
        Self {
            store,
            csrf: CsrfGuard::new(),
            idle_timeout: TimeDelta::seconds(i64::try_from(idle_timeout_seconds).unwrap_or(i64::MAX)),
        }
    }

    pub fn idle_timeout(&self) -> TimeDelta {
        self.idle_timeout
    }

    /// Open a session under a freshly drawn identifier with its own CSRF token
    pub async fn create(
        &self,
        user_id: UserId,
        role: Role,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> StoreResult<Session> {
        let session = Session {
            id: random_token(TOKEN_LENGTH),
            user_id,
            role,
            csrf_token: self.csrf.issue(),
            origin: origin.map(str::to_string),
            created_at: now,
            last_activity: now,
        };
        self.store.put(&session).await?;

        info!(
            "Created session {} for user {}",
            session.log_id(),
            session.user_id
        );
        Ok(session)
    }

    /// Check a session against the idle timeout and refresh it when still live
    ///
    /// The expiry decision is made on a single read of `last_activity`. A
    /// session at exactly the timeout is still active.
    pub async fn validate(&self, id: &str, now: DateTime<Utc>) -> StoreResult<SessionStatus> {
        let Some(snapshot) = self.store.get(id).await? else {
            return Ok(SessionStatus::NotFound);
        };

        if snapshot.idle_for(now) > self.idle_timeout {
            self.store.delete(id).await?;
            info!(
                "Session {} for user {} expired after {}s idle",
                log_prefix(id),
                snapshot.user_id,
                snapshot.idle_for(now).num_seconds()
            );
            return Ok(SessionStatus::Expired(snapshot));
        }

        // A concurrent logout between the read and the refresh wins.
        match self.store.touch(id, now).await? {
            Some(session) => Ok(SessionStatus::Active(session)),
            None => Ok(SessionStatus::NotFound),
        }
    }

    /// Look a session up without refreshing or expiring it
    pub async fn peek(&self, id: &str) -> StoreResult<Option<Session>> {
        self.store.get(id).await
    }

    /// Remove a session; unknown identifiers are ignored
    pub async fn destroy(&self, id: &str) -> StoreResult<()> {
        if self.store.delete(id).await? {
            debug!("Destroyed session {}", log_prefix(id));
        }
        Ok(())
    }

    /// Remove every session belonging to `user_id`
    pub async fn destroy_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        let removed = self.store.delete_for_user(user_id).await?;
        if removed > 0 {
            info!("Revoked {} session(s) for user {}", removed, user_id);
        }
        Ok(removed)
    }

    /// Reclaim sessions idle longer than the timeout
    pub async fn sweep(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        self.store.delete_idle(now - self.idle_timeout).await
    }
}
