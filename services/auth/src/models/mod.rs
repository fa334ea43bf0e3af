//! Authentication service models

pub mod audit;
pub mod login_attempt;
pub mod role;
pub mod session;
pub mod user;

// Re-export for convenience
pub use audit::{AuditAction, AuditEntry};
pub use login_attempt::LoginAttempt;
pub use role::{Role, UnknownRole};
pub use session::Session;
pub use user::{NewUser, PublicUser, User, UserId, UserSummary};
