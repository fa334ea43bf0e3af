//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

use sims_auth::config::PortalConfig;
use sims_auth::error::{StoreError, StoreResult};
use sims_auth::models::{AuditEntry, LoginAttempt, NewUser, Role, User, UserId};
use sims_auth::password::{Argon2Hasher, PasswordHasher};
use sims_auth::repositories::{
    AuditRepository, LoginAttemptRepository, MemoryAuditRepository, MemoryLoginAttemptRepository,
    MemoryUserRepository, UserRepository,
};
use sims_auth::session::MemorySessionStore;
use sims_auth::{AppState, Backends, LoginRequest};

pub const ORIGIN: &str = "192.0.2.10";

/// Fixed test clock
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::seconds(secs)
}

/// Cheap Argon2 parameters so tests stay fast
pub fn test_hasher() -> Arc<Argon2Hasher> {
    Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap())
}

pub fn login_request(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
        origin: ORIGIN.to_string(),
        previous_session: None,
    }
}

/// Application state over in-memory stores, with handles on each store
pub struct Harness {
    pub state: AppState,
    pub users: MemoryUserRepository,
    pub attempts: MemoryLoginAttemptRepository,
    pub audit: MemoryAuditRepository,
    pub sessions: MemorySessionStore,
    pub hasher: Arc<Argon2Hasher>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(PortalConfig::default())
    }

    pub fn with_config(config: PortalConfig) -> Self {
        let users = MemoryUserRepository::new();
        let attempts = MemoryLoginAttemptRepository::new();
        let audit = MemoryAuditRepository::new();
        let sessions = MemorySessionStore::new();
        let hasher = test_hasher();

        let backends = Backends {
            users: Arc::new(users.clone()),
            attempts: Arc::new(attempts.clone()),
            audit: Arc::new(audit.clone()),
            sessions: Arc::new(sessions.clone()),
            hasher: hasher.clone(),
        };

        Self {
            state: AppState::new(config, backends).unwrap(),
            users,
            attempts,
            audit,
            sessions,
            hasher,
        }
    }

    /// Build state around replacement repositories, for fault injection
    pub fn with_backends(backends: Backends) -> AppState {
        AppState::new(PortalConfig::default(), backends).unwrap()
    }

    pub async fn add_user(&self, username: &str, password: &str, role: Role) -> User {
        add_user_to(&self.users, &*self.hasher, username, password, role).await
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        self.audit
            .all()
            .await
            .into_iter()
            .map(|entry| entry.action.to_string())
            .collect()
    }
}

pub async fn add_user_to(
    users: &dyn UserRepository,
    hasher: &dyn PasswordHasher,
    username: &str,
    password: &str,
    role: Role,
) -> User {
    users
        .create(
            &NewUser {
                username: username.to_string(),
                password_digest: hasher.hash(password).unwrap(),
                role,
                full_name: format!("{username} Example"),
                email: None,
            },
            at(0),
        )
        .await
        .unwrap()
}

fn outage() -> StoreError {
    StoreError::Unavailable("simulated outage".to_string())
}

/// Audit log whose every write fails
pub struct FailingAudit;

#[async_trait]
impl AuditRepository for FailingAudit {
    async fn append(&self, _entry: &AuditEntry) -> StoreResult<()> {
        Err(outage())
    }

    async fn recent(&self, _limit: u32) -> StoreResult<Vec<AuditEntry>> {
        Err(outage())
    }

    async fn count(&self) -> StoreResult<u64> {
        Err(outage())
    }
}

/// Attempt log that loses every write but still answers counts
#[derive(Default)]
pub struct WriteFailingAttempts {
    pub inner: MemoryLoginAttemptRepository,
}

#[async_trait]
impl LoginAttemptRepository for WriteFailingAttempts {
    async fn record(&self, _attempt: &LoginAttempt) -> StoreResult<()> {
        Err(outage())
    }

    async fn count_failures_since(&self, username: &str, since: DateTime<Utc>) -> StoreResult<u32> {
        self.inner.count_failures_since(username, since).await
    }
}

/// Attempt log that cannot be read
pub struct UnreadableAttempts;

#[async_trait]
impl LoginAttemptRepository for UnreadableAttempts {
    async fn record(&self, _attempt: &LoginAttempt) -> StoreResult<()> {
        Ok(())
    }

    async fn count_failures_since(&self, _username: &str, _since: DateTime<Utc>) -> StoreResult<u32> {
        Err(outage())
    }
}

/// User table that is down
pub struct FailingUsers;

#[async_trait]
impl UserRepository for FailingUsers {
    async fn find_by_username(&self, _username: &str) -> StoreResult<Option<User>> {
        Err(outage())
    }

    async fn find_by_id(&self, _id: UserId) -> StoreResult<Option<User>> {
        Err(outage())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Err(outage())
    }

    async fn create(&self, _new_user: &NewUser, _now: DateTime<Utc>) -> StoreResult<User> {
        Err(outage())
    }

    async fn record_login(&self, _id: UserId, _at: DateTime<Utc>) -> StoreResult<()> {
        Err(outage())
    }

    async fn set_active(&self, _id: UserId, _active: bool, _now: DateTime<Utc>) -> StoreResult<bool> {
        Err(outage())
    }

    async fn set_role(&self, _id: UserId, _role: Role, _now: DateTime<Utc>) -> StoreResult<bool> {
        Err(outage())
    }

    async fn set_password_digest(
        &self,
        _id: UserId,
        _digest: &str,
        _now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Err(outage())
    }

    async fn delete(&self, _id: UserId) -> StoreResult<bool> {
        Err(outage())
    }
}
