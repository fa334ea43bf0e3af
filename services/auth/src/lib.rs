//! Authentication and session security for the student information portal
//!
//! Credential verification, username-keyed login throttling, idle-timeout
//! sessions with fixation-resistant regeneration, per-session CSRF tokens,
//! role checks and a security audit trail, plus the axum routes that expose
//! them.

pub mod accounts;
pub mod audit;
pub mod authz;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod csrf;
pub mod database;
pub mod error;
pub mod janitor;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;
pub mod throttle;
pub mod validation;

pub use error::{AuthError, StoreError, UnauthenticatedReason};
pub use service::{AuthService, LoginOutcome, LoginRequest, SessionContext};
pub use state::{AppState, Backends};
