//! Error types for the authentication service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{CacheError, DatabaseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::password::PasswordError;
use crate::validation::ValidationError;

/// Any persistence fault from a repository or session store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("failed to (de)serialize stored record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back to a model
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A uniqueness constraint rejected the write
    #[error("conflict: {0}")]
    Conflict(String),

    /// Injected or simulated outage
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(DatabaseError::Query(e))
    }
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Why a protected request has no usable session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// No cookie, unknown identifier, or the owning user no longer exists
    NoSession,
    /// The session idled past the timeout
    Expired,
    /// The owning account was deactivated after login
    Deactivated,
}

pub const MSG_INVALID_CREDENTIALS: &str = "Invalid username or password.";
pub const MSG_LOCKED: &str = "Too many failed login attempts. Please try again later.";
pub const MSG_DEACTIVATED: &str =
    "Your account has been deactivated. Please contact an administrator.";
pub const MSG_SERVER_ERROR: &str = "An internal error occurred. Please try again later.";
pub const MSG_NOT_AUTHENTICATED: &str = "Not authenticated";
pub const MSG_FORBIDDEN: &str = "Access denied.";
pub const MSG_MISSING_FIELDS: &str = "Username and password are required.";

/// Outcome taxonomy for authentication, session and authorization failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// Unknown user or wrong password; the two are never distinguished
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("too many failed login attempts")]
    Locked,

    #[error("account deactivated")]
    Deactivated,

    #[error("unauthenticated ({0:?})")]
    Unauthenticated(UnauthenticatedReason),

    #[error("forbidden")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(#[from] PasswordError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Locked => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Deactivated => StatusCode::FORBIDDEN,
            AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The only text a client ever sees for this error
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => MSG_INVALID_CREDENTIALS.to_string(),
            AuthError::Locked => MSG_LOCKED.to_string(),
            AuthError::Deactivated => MSG_DEACTIVATED.to_string(),
            AuthError::Unauthenticated(UnauthenticatedReason::Deactivated) => {
                MSG_DEACTIVATED.to_string()
            }
            AuthError::Unauthenticated(_) => MSG_NOT_AUTHENTICATED.to_string(),
            AuthError::Forbidden => MSG_FORBIDDEN.to_string(),
            AuthError::BadRequest(msg) | AuthError::Conflict(msg) => msg.clone(),
            AuthError::NotFound => "Not found.".to_string(),
            AuthError::Internal(_) | AuthError::Hashing(_) => MSG_SERVER_ERROR.to_string(),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(e: ValidationError) -> Self {
        AuthError::BadRequest(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Internal(source) => error!("Request failed on a storage fault: {}", source),
            AuthError::Hashing(source) => error!("Request failed while hashing: {}", source),
            _ => {}
        }

        let body = Json(json!({
            "ok": false,
            "message": self.user_message(),
        }));

        (self.status(), body).into_response()
    }
}
