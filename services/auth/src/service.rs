//! Authentication service
//!
//! Orchestrates throttling, credential checks, the session lifecycle, CSRF
//! checks, authorization and audit logging for login, logout and every
//! protected request.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::audit::AuditLogger;
use crate::authz::Requirement;
use crate::credentials::CredentialStore;
use crate::csrf::CsrfGuard;
use crate::error::{AuthError, MSG_MISSING_FIELDS, UnauthenticatedReason};
use crate::ledger::LoginLedger;
use crate::models::{AuditAction, AuditEntry, PublicUser, Session, User};
use crate::session::{SessionManager, SessionStatus};
use crate::throttle::{ThrottleConfig, ThrottleDecision, ThrottlePolicy};

/// A login form submission
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Client address
    pub origin: String,
    /// Session identifier the client presented before authenticating, if any
    pub previous_session: Option<String>,
}

/// A successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: PublicUser,
    /// Landing page for the user's role
    pub redirect: &'static str,
}

/// A validated session together with the freshly read owning user
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: Session,
    pub user: User,
}

/// Whether a protected entry point needs an anti-forgery token
#[derive(Debug, Clone, Copy)]
pub enum CsrfCheck<'a> {
    Skip,
    /// Verify the supplied token, if any
    Require(Option<&'a str>),
}

#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialStore,
    ledger: LoginLedger,
    throttle: ThrottlePolicy,
    sessions: SessionManager,
    csrf: CsrfGuard,
    audit: AuditLogger,
}

impl AuthService {
    pub fn new(
        credentials: CredentialStore,
        ledger: LoginLedger,
        throttle: ThrottleConfig,
        sessions: SessionManager,
        audit: AuditLogger,
    ) -> Self {
        Self {
            credentials,
            throttle: ThrottlePolicy::new(throttle, ledger.clone()),
            ledger,
            sessions,
            csrf: CsrfGuard::new(),
            audit,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Authenticate and open a new session
    ///
    /// Unknown usernames and wrong passwords produce the same error after the
    /// same amount of hashing work. A lockout is decided before any password
    /// is checked and is not itself recorded as a failed attempt.
    pub async fn login(
        &self,
        request: LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(AuthError::BadRequest(MSG_MISSING_FIELDS.to_string()));
        }
        let origin = request.origin.as_str();

        if self.throttle.decide(username, now).await? == ThrottleDecision::Lockout {
            self.audit
                .log(
                    AuditEntry::new(AuditAction::Lockout, now)
                        .target("user", None)
                        .detail(format!(
                            "Login refused for '{}': too many failed attempts",
                            username
                        ))
                        .origin(Some(origin)),
                )
                .await;
            return Err(AuthError::Locked);
        }

        let found = self.credentials.find_by_username(username).await?;
        let Some(user) = self.credentials.verify_against(found.as_ref(), &request.password) else {
            self.ledger.record(username, false, origin, now).await;
            self.audit
                .log(
                    AuditEntry::new(AuditAction::LoginFailed, now)
                        .target("user", None)
                        .detail(format!("Invalid credentials for '{}'", username))
                        .origin(Some(origin)),
                )
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            self.ledger.record(username, false, origin, now).await;
            self.audit
                .log(
                    AuditEntry::new(AuditAction::LoginFailed, now)
                        .target("user", Some(user.id))
                        .detail(format!("Login to deactivated account '{}'", user.username))
                        .origin(Some(origin)),
                )
                .await;
            return Err(AuthError::Deactivated);
        }

        self.ledger.record(username, true, origin, now).await;
        self.credentials.record_successful_login(user.id, now).await;

        if let Some(previous) = request.previous_session.as_deref() {
            if let Err(e) = self.sessions.destroy(previous).await {
                warn!("Failed to discard pre-login session: {}", e);
            }
        }

        let session = self
            .sessions
            .create(user.id, user.role, Some(origin), now)
            .await?;

        self.audit
            .log(
                AuditEntry::new(AuditAction::Login, now)
                    .actor(user.id)
                    .target("user", Some(user.id))
                    .detail(format!("{} logged in as {}", user.username, user.role))
                    .origin(Some(origin)),
            )
            .await;
        info!("User {} logged in from {}", user.id, origin);

        Ok(LoginOutcome {
            session,
            user: user.public(),
            redirect: user.role.home_path(),
        })
    }

    /// End a session. Succeeds for missing, unknown and already-destroyed
    /// sessions alike; storage faults are logged and swallowed.
    pub async fn logout(&self, session_id: Option<&str>, origin: &str, now: DateTime<Utc>) {
        let Some(id) = session_id.filter(|id| !id.is_empty()) else {
            return;
        };

        match self.sessions.peek(id).await {
            Ok(Some(session)) => {
                self.audit
                    .log(
                        AuditEntry::new(AuditAction::Logout, now)
                            .actor(session.user_id)
                            .target("user", Some(session.user_id))
                            .origin(Some(origin)),
                    )
                    .await;
            }
            Ok(None) => return,
            Err(e) => warn!("Session lookup during logout failed: {}", e),
        }

        if let Err(e) = self.sessions.destroy(id).await {
            warn!("Failed to destroy session during logout: {}", e);
        }
    }

    /// Resolve a session identifier into a live session and its current user
    ///
    /// The owning user is re-read on every call: a deleted or deactivated
    /// account loses its sessions on the next request.
    pub async fn require_session(
        &self,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionContext, AuthError> {
        let Some(id) = session_id.filter(|id| !id.is_empty()) else {
            return Err(AuthError::Unauthenticated(UnauthenticatedReason::NoSession));
        };

        let session = match self.sessions.validate(id, now).await? {
            SessionStatus::Active(session) => session,
            SessionStatus::NotFound => {
                return Err(AuthError::Unauthenticated(UnauthenticatedReason::NoSession));
            }
            SessionStatus::Expired(stale) => {
                self.audit
                    .log(
                        AuditEntry::new(AuditAction::SessionExpired, now)
                            .actor(stale.user_id)
                            .target("user", Some(stale.user_id))
                            .origin(stale.origin.as_deref()),
                    )
                    .await;
                return Err(AuthError::Unauthenticated(UnauthenticatedReason::Expired));
            }
        };

        let Some(user) = self.credentials.find_by_id(session.user_id).await? else {
            self.sessions.destroy(&session.id).await?;
            return Err(AuthError::Unauthenticated(UnauthenticatedReason::NoSession));
        };

        if !user.is_active {
            self.sessions.destroy(&session.id).await?;
            info!("Closed session of deactivated user {}", user.id);
            return Err(AuthError::Unauthenticated(UnauthenticatedReason::Deactivated));
        }

        Ok(SessionContext { session, user })
    }

    /// Check the current role of the session's user against `requirement`
    pub async fn authorize(
        &self,
        context: &SessionContext,
        requirement: Requirement,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if requirement.permits(context.user.role) {
            return Ok(());
        }

        self.deny(
            context,
            format!("Requires {}, has role {}", requirement, context.user.role),
            origin,
            now,
        )
        .await
    }

    /// Check an anti-forgery token against the session
    pub async fn verify_csrf(
        &self,
        context: &SessionContext,
        supplied: Option<&str>,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if self.csrf.verify(&context.session, supplied) {
            return Ok(());
        }

        self.deny(
            context,
            "Missing or invalid CSRF token".to_string(),
            origin,
            now,
        )
        .await
    }

    /// Full check for a protected entry point: live session, role, then
    /// anti-forgery token when required
    pub async fn guard(
        &self,
        session_id: Option<&str>,
        requirement: Requirement,
        csrf: CsrfCheck<'_>,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionContext, AuthError> {
        let context = self.require_session(session_id, now).await?;
        self.authorize(&context, requirement, origin, now).await?;
        if let CsrfCheck::Require(supplied) = csrf {
            self.verify_csrf(&context, supplied, origin, now).await?;
        }
        Ok(context)
    }

    /// Public identity and CSRF token of the caller
    pub async fn who_am_i(
        &self,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(PublicUser, String), AuthError> {
        let context = self.require_session(session_id, now).await?;
        Ok((context.user.public(), context.session.csrf_token))
    }

    async fn deny(
        &self,
        context: &SessionContext,
        detail: String,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.audit
            .log(
                AuditEntry::new(AuditAction::AccessDenied, now)
                    .actor(context.user.id)
                    .detail(detail)
                    .origin(Some(origin)),
            )
            .await;
        Err(AuthError::Forbidden)
    }
}
