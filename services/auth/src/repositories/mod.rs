//! Repository interfaces for the authentication tables
//!
//! Each table the core depends on sits behind an object-safe async trait so
//! the service can run against PostgreSQL in production and in memory in
//! tests and single-process development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{AuditEntry, LoginAttempt, NewUser, Role, User, UserId};

pub mod audit;
pub mod login_attempt;
pub mod memory;
pub mod user;

pub use audit::PgAuditRepository;
pub use login_attempt::PgLoginAttemptRepository;
pub use memory::{MemoryAuditRepository, MemoryLoginAttemptRepository, MemoryUserRepository};
pub use user::PgUserRepository;

/// Credential rows
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Case-insensitive lookup
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// All users, newest first
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Insert a user; a case-insensitive username clash yields `StoreError::Conflict`
    async fn create(&self, new_user: &NewUser, now: DateTime<Utc>) -> StoreResult<User>;

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<()>;

    /// Returns `false` when no such user exists
    async fn set_active(&self, id: UserId, active: bool, now: DateTime<Utc>) -> StoreResult<bool>;

    async fn set_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<bool>;

    async fn set_password_digest(
        &self,
        id: UserId,
        digest: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    async fn delete(&self, id: UserId) -> StoreResult<bool>;
}

/// Append-only login attempt log
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    async fn record(&self, attempt: &LoginAttempt) -> StoreResult<()>;

    /// Failed attempts for `username` (compared case-insensitively) at or after `since`
    async fn count_failures_since(&self, username: &str, since: DateTime<Utc>) -> StoreResult<u32>;
}

/// Append-only audit log
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditEntry>>;

    async fn count(&self) -> StoreResult<u64>;
}
