//! In-memory repositories
//!
//! Used by the test suites and by `storage.backend = "memory"` for
//! single-process development. State lives only as long as the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AuditRepository, LoginAttemptRepository, UserRepository};
use crate::error::{StoreError, StoreResult};
use crate::models::{AuditEntry, LoginAttempt, NewUser, Role, User, UserId};

#[derive(Default)]
struct UserTable {
    next_id: UserId,
    rows: BTreeMap<UserId, User>,
}

/// In-memory user repository
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: UserId, now: DateTime<Utc>, apply: F) -> bool
    where
        F: FnOnce(&mut User),
    {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id) {
            Some(user) => {
                apply(user);
                user.updated_at = now;
                true
            }
            None => false,
        }
    }
}

/// Full Unicode case folding, as `LOWER()` does in PostgreSQL
fn same_username(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|user| same_username(&user.username, username))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let table = self.table.read().await;
        let mut users: Vec<User> = table.rows.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn create(&self, new_user: &NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut table = self.table.write().await;

        let clash = table.rows.values().any(|user| {
            same_username(&user.username, &new_user.username)
                || (new_user.email.is_some() && user.email == new_user.email)
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "username or email already taken: {}",
                new_user.username
            )));
        }

        table.next_id += 1;
        let user = User {
            id: table.next_id,
            username: new_user.username.clone(),
            password_digest: new_user.password_digest.clone(),
            role: new_user.role,
            full_name: new_user.full_name.clone(),
            email: new_user.email.clone(),
            is_active: true,
            created_at: now,
            last_login: None,
            updated_at: now,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> StoreResult<()> {
        let mut table = self.table.write().await;
        if let Some(user) = table.rows.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn set_active(&self, id: UserId, active: bool, now: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self.update(id, now, |user| user.is_active = active).await)
    }

    async fn set_role(&self, id: UserId, role: Role, now: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self.update(id, now, |user| user.role = role).await)
    }

    async fn set_password_digest(
        &self,
        id: UserId,
        digest: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let digest = digest.to_string();
        Ok(self
            .update(id, now, move |user| user.password_digest = digest)
            .await)
    }

    async fn delete(&self, id: UserId) -> StoreResult<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}

/// In-memory login attempt log
#[derive(Clone, Default)]
pub struct MemoryLoginAttemptRepository {
    attempts: Arc<RwLock<Vec<LoginAttempt>>>,
}

impl MemoryLoginAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first
    pub async fn all(&self) -> Vec<LoginAttempt> {
        self.attempts.read().await.clone()
    }
}

#[async_trait]
impl LoginAttemptRepository for MemoryLoginAttemptRepository {
    async fn record(&self, attempt: &LoginAttempt) -> StoreResult<()> {
        self.attempts.write().await.push(attempt.clone());
        Ok(())
    }

    async fn count_failures_since(&self, username: &str, since: DateTime<Utc>) -> StoreResult<u32> {
        let attempts = self.attempts.read().await;
        let count = attempts
            .iter()
            .filter(|a| {
                !a.success && a.attempted_at >= since && same_username(&a.username, username)
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// In-memory audit log
#[derive(Clone, Default)]
pub struct MemoryAuditRepository {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far, oldest first
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.entries.read().await.len() as u64)
    }
}
