//! Anti-forgery tokens bound to sessions

use crate::crypto::{TOKEN_LENGTH, constant_time_eq, random_token};
use crate::models::Session;

/// Issues and checks per-session CSRF tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfGuard;

impl CsrfGuard {
    pub fn new() -> Self {
        Self
    }

    /// Fresh token for a session being created
    pub fn issue(&self) -> String {
        random_token(TOKEN_LENGTH)
    }

    /// Whether `supplied` matches the token stored on `session`.
    /// A missing or empty token never matches.
    pub fn verify(&self, session: &Session, supplied: Option<&str>) -> bool {
        match supplied {
            Some(token) if !token.is_empty() => {
                constant_time_eq(session.csrf_token.as_bytes(), token.as_bytes())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn session_with(token: &str) -> Session {
        let now = Utc::now();
        Session {
            id: "sid".to_string(),
            user_id: 1,
            role: Role::Teacher,
            csrf_token: token.to_string(),
            origin: None,
            created_at: now,
            last_activity: now,
        }
    }

    #[test]
    fn test_issued_tokens_are_unique() {
        let guard = CsrfGuard::new();
        assert_ne!(guard.issue(), guard.issue());
        assert_eq!(guard.issue().len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_verify() {
        let guard = CsrfGuard::new();
        let token = guard.issue();
        let session = session_with(&token);

        assert!(guard.verify(&session, Some(&token)));
        assert!(!guard.verify(&session, None));
        assert!(!guard.verify(&session, Some("")));
        assert!(!guard.verify(&session, Some(&token[..10])));

        let mut tampered = token.clone();
        tampered.replace_range(0..1, if token.starts_with('A') { "B" } else { "A" });
        assert!(!guard.verify(&session, Some(&tampered)));
    }
}
