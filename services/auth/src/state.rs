//! Application state shared across handlers

use sqlx::PgPool;
use std::sync::Arc;

use crate::accounts::AccountService;
use crate::audit::AuditLogger;
use crate::config::PortalConfig;
use crate::credentials::CredentialStore;
use crate::ledger::LoginLedger;
use crate::password::{PasswordError, PasswordHasher};
use crate::repositories::{
    AuditRepository, LoginAttemptRepository, MemoryAuditRepository, MemoryLoginAttemptRepository,
    MemoryUserRepository, PgAuditRepository, PgLoginAttemptRepository, PgUserRepository,
    UserRepository,
};
use crate::service::AuthService;
use crate::session::{MemorySessionStore, SessionManager, SessionStore};

/// Storage implementations behind the service
#[derive(Clone)]
pub struct Backends {
    pub users: Arc<dyn UserRepository>,
    pub attempts: Arc<dyn LoginAttemptRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub hasher: Arc<dyn PasswordHasher>,
}

impl Backends {
    /// Everything in process memory
    pub fn in_memory(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            users: Arc::new(MemoryUserRepository::new()),
            attempts: Arc::new(MemoryLoginAttemptRepository::new()),
            audit: Arc::new(MemoryAuditRepository::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            hasher,
        }
    }

    /// PostgreSQL tables with the given session store
    pub fn postgres(
        pool: PgPool,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            attempts: Arc::new(PgLoginAttemptRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool)),
            sessions,
            hasher,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub accounts: AccountService,
    pub config: Arc<PortalConfig>,
}

impl AppState {
    pub fn new(config: PortalConfig, backends: Backends) -> Result<Self, PasswordError> {
        let credentials = CredentialStore::new(backends.users, backends.hasher)?;
        let ledger = LoginLedger::new(backends.attempts);
        let audit = AuditLogger::new(backends.audit);
        let sessions =
            SessionManager::new(backends.sessions, config.security.session_timeout_seconds);

        let auth = AuthService::new(
            credentials.clone(),
            ledger,
            config.security.throttle(),
            sessions.clone(),
            audit.clone(),
        );
        let accounts = AccountService::new(credentials, sessions, audit);

        Ok(Self {
            auth,
            accounts,
            config: Arc::new(config),
        })
    }
}
