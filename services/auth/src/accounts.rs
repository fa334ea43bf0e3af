//! Account administration
//!
//! Every mutation is audited against the acting administrator. Changes that
//! take a user's access away also revoke that user's open sessions.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::audit::AuditLogger;
use crate::credentials::CredentialStore;
use crate::error::{AuthError, StoreError};
use crate::models::{AuditAction, AuditEntry, NewUser, Role, User, UserId, UserSummary};
use crate::service::SessionContext;
use crate::session::SessionManager;
use crate::validation::{
    validate_email, validate_full_name, validate_password, validate_username,
};

pub const DEFAULT_AUDIT_LIMIT: u32 = 50;
pub const MAX_AUDIT_LIMIT: u32 = 500;

/// Fields for a new account
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    credentials: CredentialStore,
    sessions: SessionManager,
    audit: AuditLogger,
}

impl AccountService {
    pub fn new(credentials: CredentialStore, sessions: SessionManager, audit: AuditLogger) -> Self {
        Self {
            credentials,
            sessions,
            audit,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, AuthError> {
        let users = self.credentials.users().list().await?;
        Ok(users.iter().map(User::summary).collect())
    }

    pub async fn create_user(
        &self,
        actor: &SessionContext,
        request: CreateUser,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<UserSummary, AuthError> {
        let username = request.username.trim();
        validate_username(username)?;
        validate_password(&request.password)?;
        validate_full_name(&request.full_name)?;
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        if let Some(email) = email {
            validate_email(email)?;
        }

        if self.credentials.find_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict("Username already exists.".to_string()));
        }

        let new_user = NewUser {
            username: username.to_string(),
            password_digest: self.credentials.hash_password(&request.password)?,
            role: request.role,
            full_name: request.full_name.trim().to_string(),
            email: email.map(str::to_string),
        };

        let user = match self.credentials.users().create(&new_user, now).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => {
                return Err(AuthError::Conflict(
                    "Username or email already exists.".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        self.record(
            actor,
            AuditAction::UserCreated,
            user.id,
            format!("Created {} as {}", user.username, user.role),
            origin,
            now,
        )
        .await;
        info!("User {} created account {}", actor.user.id, user.id);

        Ok(user.summary())
    }

    /// Activate or deactivate an account. Deactivation ends the user's sessions.
    pub async fn set_active(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        active: bool,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<UserSummary, AuthError> {
        if !active && user_id == actor.user.id {
            return Err(AuthError::BadRequest(
                "You cannot deactivate your own account.".to_string(),
            ));
        }

        if !self.credentials.users().set_active(user_id, active, now).await? {
            return Err(AuthError::NotFound);
        }

        let action = if active {
            AuditAction::UserActivated
        } else {
            self.sessions.destroy_for_user(user_id).await?;
            AuditAction::UserDeactivated
        };
        let user = self.reload(user_id).await?;
        self.record(
            actor,
            action,
            user_id,
            format!("{} is now {}", user.username, if active { "active" } else { "inactive" }),
            origin,
            now,
        )
        .await;

        Ok(user.summary())
    }

    /// Takes effect on the user's next request
    pub async fn change_role(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        role: Role,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<UserSummary, AuthError> {
        if user_id == actor.user.id {
            return Err(AuthError::BadRequest(
                "You cannot change your own role.".to_string(),
            ));
        }

        let before = self.reload(user_id).await?;
        if !self.credentials.users().set_role(user_id, role, now).await? {
            return Err(AuthError::NotFound);
        }

        self.record(
            actor,
            AuditAction::RoleChanged,
            user_id,
            format!("{}: {} -> {}", before.username, before.role, role),
            origin,
            now,
        )
        .await;

        Ok(self.reload(user_id).await?.summary())
    }

    /// Set a new password. Another user's sessions are revoked.
    pub async fn reset_password(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        new_password: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let digest = self.credentials.hash_password(new_password)?;

        if !self
            .credentials
            .users()
            .set_password_digest(user_id, &digest, now)
            .await?
        {
            return Err(AuthError::NotFound);
        }

        if user_id != actor.user.id {
            self.sessions.destroy_for_user(user_id).await?;
        }

        self.record(
            actor,
            AuditAction::PasswordReset,
            user_id,
            "Password reset".to_string(),
            origin,
            now,
        )
        .await;
        Ok(())
    }

    pub async fn delete_user(
        &self,
        actor: &SessionContext,
        user_id: UserId,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if user_id == actor.user.id {
            return Err(AuthError::BadRequest(
                "You cannot delete your own account.".to_string(),
            ));
        }

        let user = self.reload(user_id).await?;
        self.sessions.destroy_for_user(user_id).await?;
        if !self.credentials.users().delete(user_id).await? {
            return Err(AuthError::NotFound);
        }

        self.record(
            actor,
            AuditAction::UserDeleted,
            user_id,
            format!("Deleted {}", user.username),
            origin,
            now,
        )
        .await;
        info!("User {} deleted account {}", actor.user.id, user_id);
        Ok(())
    }

    /// Most recent audit entries, newest first. `limit` is clamped to 1..=500.
    pub async fn recent_audit(&self, limit: Option<u32>) -> Result<Vec<AuditEntry>, AuthError> {
        let limit = limit
            .unwrap_or(DEFAULT_AUDIT_LIMIT)
            .clamp(1, MAX_AUDIT_LIMIT);
        Ok(self.audit.recent(limit).await?)
    }

    pub async fn audit_count(&self) -> Result<u64, AuthError> {
        Ok(self.audit.count().await?)
    }

    async fn reload(&self, user_id: UserId) -> Result<User, AuthError> {
        self.credentials
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    async fn record(
        &self,
        actor: &SessionContext,
        action: AuditAction,
        user_id: UserId,
        detail: String,
        origin: &str,
        now: DateTime<Utc>,
    ) {
        self.audit
            .log(
                AuditEntry::new(action, now)
                    .actor(actor.user.id)
                    .target("user", Some(user_id))
                    .detail(detail)
                    .origin(Some(origin)),
            )
            .await;
    }
}
