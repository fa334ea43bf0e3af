//! Audit log entry and its action vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::UserId;

/// What happened, from a known vocabulary
///
/// Record-management screens log their own actions through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    Lockout,
    AccessDenied,
    SessionExpired,
    UserCreated,
    UserActivated,
    UserDeactivated,
    RoleChanged,
    PasswordReset,
    UserDeleted,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::Login => "login",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Logout => "logout",
            AuditAction::Lockout => "lockout",
            AuditAction::AccessDenied => "access_denied",
            AuditAction::SessionExpired => "session_expired",
            AuditAction::UserCreated => "user_created",
            AuditAction::UserActivated => "user_activated",
            AuditAction::UserDeactivated => "user_deactivated",
            AuditAction::RoleChanged => "role_changed",
            AuditAction::PasswordReset => "password_reset",
            AuditAction::UserDeleted => "user_deleted",
            AuditAction::Other(tag) => tag,
        }
    }
}

impl From<String> for AuditAction {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "login" => AuditAction::Login,
            "login_failed" => AuditAction::LoginFailed,
            "logout" => AuditAction::Logout,
            "lockout" => AuditAction::Lockout,
            "access_denied" => AuditAction::AccessDenied,
            "session_expired" => AuditAction::SessionExpired,
            "user_created" => AuditAction::UserCreated,
            "user_activated" => AuditAction::UserActivated,
            "user_deactivated" => AuditAction::UserDeactivated,
            "role_changed" => AuditAction::RoleChanged,
            "password_reset" => AuditAction::PasswordReset,
            "user_deleted" => AuditAction::UserDeleted,
            _ => AuditAction::Other(tag),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of a security-relevant event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Authenticated actor, absent for anonymous events such as failed logins
    pub actor_id: Option<UserId>,
    pub action: AuditAction,
    pub target_type: Option<String>,
    pub target_id: Option<i64>,
    pub detail: Option<String>,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, at: DateTime<Utc>) -> Self {
        Self {
            actor_id: None,
            action,
            target_type: None,
            target_id: None,
            detail: None,
            origin: None,
            created_at: at,
        }
    }

    pub fn actor(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn target(mut self, target_type: impl Into<String>, target_id: Option<i64>) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = target_id;
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn origin(mut self, origin: Option<&str>) -> Self {
        self.origin = origin.map(str::to_string);
        self
    }
}
