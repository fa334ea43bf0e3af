//! Login, session and authorization flows through the authentication service

mod common;

use std::sync::Arc;

use common::{
    FailingAudit, FailingUsers, Harness, ORIGIN, UnreadableAttempts, WriteFailingAttempts, at,
    login_request, test_hasher,
};
use sims_auth::authz::Requirement;
use sims_auth::error::{AuthError, MSG_SERVER_ERROR, UnauthenticatedReason};
use sims_auth::models::{AuditAction, Role};
use sims_auth::repositories::{MemoryUserRepository, UserRepository};
use sims_auth::service::CsrfCheck;
use sims_auth::session::{MemorySessionStore, SessionStore};
use sims_auth::{Backends, LoginRequest};

const TEACHER_PASSWORD: &str = "Wonder1and!";

#[tokio::test]
async fn test_successful_login_opens_session() {
    let h = Harness::new();
    let alice = h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;

    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(10))
        .await
        .unwrap();

    assert_eq!(outcome.user.id, alice.id);
    assert_eq!(outcome.redirect, "/portal/teacher");
    assert_eq!(outcome.session.user_id, alice.id);
    assert!(!outcome.session.csrf_token.is_empty());
    assert!(h.sessions.get(&outcome.session.id).await.unwrap().is_some());

    let reloaded = h.users.find_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_login, Some(at(10)));

    let attempts = h.attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].success);
    assert_eq!(attempts[0].origin, ORIGIN);
    assert!(h.audit_actions().await.contains(&"login".to_string()));
}

#[tokio::test]
async fn test_username_lookup_ignores_case_and_whitespace() {
    let h = Harness::new();
    h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;

    let outcome = h
        .state
        .auth
        .login(login_request("  ALICE ", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();
    assert_eq!(outcome.user.username, "alice");
}

#[tokio::test]
async fn test_unknown_user_looks_like_wrong_password() {
    let h = Harness::new();
    h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;

    let unknown = h
        .state
        .auth
        .login(login_request("nobody", TEACHER_PASSWORD), at(0))
        .await
        .unwrap_err();
    let wrong = h
        .state
        .auth
        .login(login_request("alice", "not-it"), at(0))
        .await
        .unwrap_err();

    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(unknown.status(), wrong.status());
    assert_eq!(unknown.user_message(), wrong.user_message());

    // Attempts against names that do not exist are still recorded.
    let attempts = h.attempts.all().await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| !a.success));
    assert_eq!(attempts[0].username, "nobody");
}

#[tokio::test]
async fn test_lockout_regardless_of_password() {
    let h = Harness::new();
    h.add_user("bob", "Bu1lder!bob", Role::Student).await;

    for t in 0..5 {
        let err = h
            .state
            .auth
            .login(login_request("bob", "guess"), at(t * 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = h
        .state
        .auth
        .login(login_request("bob", "Bu1lder!bob"), at(55))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Locked));

    // The refusal itself is not another failed attempt, but it is audited.
    assert_eq!(h.attempts.all().await.len(), 5);
    assert!(h.audit_actions().await.contains(&"lockout".to_string()));
    assert!(h.sessions.is_empty().await);
}

#[tokio::test]
async fn test_lockout_counts_usernames_case_insensitively() {
    let h = Harness::new();
    h.add_user("bob", "Bu1lder!bob", Role::Student).await;

    for (t, name) in ["bob", "Bob", "BOB", "bOb", "boB"].iter().enumerate() {
        let _ = h
            .state
            .auth
            .login(login_request(name, "guess"), at(t as i64))
            .await;
    }

    let err = h
        .state
        .auth
        .login(login_request("bob", "Bu1lder!bob"), at(10))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Locked));
}

#[tokio::test]
async fn test_lockout_releases_as_failures_age_out() {
    let h = Harness::new();
    h.add_user("bob", "Bu1lder!bob", Role::Student).await;

    for t in [0, 100, 200, 300, 400] {
        let _ = h
            .state
            .auth
            .login(login_request("bob", "guess"), at(t))
            .await;
    }

    assert!(matches!(
        h.state
            .auth
            .login(login_request("bob", "Bu1lder!bob"), at(400))
            .await,
        Err(AuthError::Locked)
    ));
    assert!(
        h.state
            .auth
            .login(login_request("bob", "Bu1lder!bob"), at(1001))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_unknown_usernames_are_throttled_too() {
    let h = Harness::new();
    for t in 0..5 {
        let _ = h
            .state
            .auth
            .login(login_request("ghost", "guess"), at(t))
            .await;
    }
    assert!(matches!(
        h.state
            .auth
            .login(login_request("ghost", "guess"), at(6))
            .await,
        Err(AuthError::Locked)
    ));
}

#[tokio::test]
async fn test_deactivated_account_is_refused() {
    let h = Harness::new();
    let carol = h.add_user("carol", "Car0l!pass", Role::Student).await;
    h.users.set_active(carol.id, false, at(0)).await.unwrap();

    let err = h
        .state
        .auth
        .login(login_request("carol", "Car0l!pass"), at(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Deactivated));

    let attempts = h.attempts.all().await;
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].success);
    assert!(h.sessions.is_empty().await);

    // Wrong password on a deactivated account says nothing about the flag.
    let err = h
        .state
        .auth
        .login(login_request("carol", "wrong"), at(2))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_missing_fields_are_rejected_without_a_record() {
    let h = Harness::new();

    for (username, password) in [("", "x"), ("   ", "x"), ("alice", "")] {
        let err = h
            .state
            .auth
            .login(login_request(username, password), at(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadRequest(_)));
    }
    assert!(h.attempts.all().await.is_empty());
}

#[tokio::test]
async fn test_login_issues_a_never_seen_session_id() {
    let h = Harness::new();
    h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;

    let first = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();

    let second = h
        .state
        .auth
        .login(
            LoginRequest {
                previous_session: Some(first.session.id.clone()),
                ..login_request("alice", TEACHER_PASSWORD)
            },
            at(5),
        )
        .await
        .unwrap();

    assert_ne!(first.session.id, second.session.id);
    assert_ne!(first.session.csrf_token, second.session.csrf_token);
    assert!(h.sessions.get(&first.session.id).await.unwrap().is_none());

    // A client-chosen identifier is discarded, never adopted.
    let planted = "attacker-chosen-session-id";
    let third = h
        .state
        .auth
        .login(
            LoginRequest {
                previous_session: Some(planted.to_string()),
                ..login_request("alice", TEACHER_PASSWORD)
            },
            at(6),
        )
        .await
        .unwrap();
    assert_ne!(third.session.id, planted);
}

#[tokio::test]
async fn test_logout_twice_is_a_no_op() {
    let h = Harness::new();
    h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();

    h.state
        .auth
        .logout(Some(&outcome.session.id), ORIGIN, at(1))
        .await;
    h.state
        .auth
        .logout(Some(&outcome.session.id), ORIGIN, at(2))
        .await;
    h.state.auth.logout(None, ORIGIN, at(3)).await;

    assert!(h.sessions.is_empty().await);
    let logouts = h
        .audit_actions()
        .await
        .into_iter()
        .filter(|a| a == "logout")
        .count();
    assert_eq!(logouts, 1);

    let err = h
        .state
        .auth
        .require_session(Some(&outcome.session.id), at(4))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthenticated(UnauthenticatedReason::NoSession)
    ));
}

#[tokio::test]
async fn test_alice_teacher_scenario() {
    let h = Harness::new();
    h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();
    let sid = Some(outcome.session.id.as_str());
    let token = outcome.session.csrf_token.as_str();
    let auth = &h.state.auth;

    let context = auth
        .guard(
            sid,
            Requirement::Exactly(Role::Teacher),
            CsrfCheck::Require(Some(token)),
            ORIGIN,
            at(10),
        )
        .await
        .unwrap();
    assert_eq!(context.user.username, "alice");

    let mut tampered = token.to_string();
    tampered.pop();
    tampered.push('!');
    let err = auth
        .guard(
            sid,
            Requirement::Exactly(Role::Teacher),
            CsrfCheck::Require(Some(&tampered)),
            ORIGIN,
            at(20),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    let err = auth
        .guard(
            sid,
            Requirement::Exactly(Role::Teacher),
            CsrfCheck::Require(None),
            ORIGIN,
            at(30),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    let err = auth
        .guard(
            sid,
            Requirement::Exactly(Role::RegistrarOfficer),
            CsrfCheck::Require(Some(token)),
            ORIGIN,
            at(40),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Forbidden));

    // Failed checks leave the session usable.
    assert!(
        auth.guard(
            sid,
            Requirement::AtLeast(Role::Student),
            CsrfCheck::Skip,
            ORIGIN,
            at(50)
        )
        .await
        .is_ok()
    );

    let denied = h
        .audit
        .all()
        .await
        .into_iter()
        .filter(|e| e.action == AuditAction::AccessDenied)
        .count();
    assert_eq!(denied, 3);
}

#[tokio::test]
async fn test_role_change_applies_on_next_request() {
    let h = Harness::new();
    let alice = h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();
    let sid = Some(outcome.session.id.as_str());

    h.users
        .set_role(alice.id, Role::RegistrarOfficer, at(1))
        .await
        .unwrap();

    let auth = &h.state.auth;
    assert!(matches!(
        auth.guard(
            sid,
            Requirement::Exactly(Role::Teacher),
            CsrfCheck::Skip,
            ORIGIN,
            at(2)
        )
        .await,
        Err(AuthError::Forbidden)
    ));
    assert!(
        auth.guard(
            sid,
            Requirement::Exactly(Role::RegistrarOfficer),
            CsrfCheck::Skip,
            ORIGIN,
            at(3)
        )
        .await
        .is_ok()
    );
}

#[tokio::test]
async fn test_deactivation_ends_open_session() {
    let h = Harness::new();
    let alice = h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();

    h.users.set_active(alice.id, false, at(1)).await.unwrap();

    let err = h
        .state
        .auth
        .require_session(Some(&outcome.session.id), at(2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthenticated(UnauthenticatedReason::Deactivated)
    ));
    assert!(h.sessions.is_empty().await);
}

#[tokio::test]
async fn test_deleted_user_session_is_dropped() {
    let h = Harness::new();
    let alice = h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();

    h.users.delete(alice.id).await.unwrap();

    let err = h
        .state
        .auth
        .require_session(Some(&outcome.session.id), at(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthenticated(UnauthenticatedReason::NoSession)
    ));
    assert!(h.sessions.is_empty().await);
}

#[tokio::test]
async fn test_idle_timeout_boundary() {
    let h = Harness::new();
    h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();
    let sid = Some(outcome.session.id.as_str());
    let timeout = 1800;

    let context = h
        .state
        .auth
        .require_session(sid, at(timeout - 1))
        .await
        .unwrap();
    assert_eq!(context.session.last_activity, at(timeout - 1));

    // Measured from the refreshed activity, not from login.
    let t1 = timeout - 1;
    assert!(
        h.state
            .auth
            .require_session(sid, at(t1 + timeout - 1))
            .await
            .is_ok()
    );

    let t2 = t1 + timeout - 1;
    let err = h
        .state
        .auth
        .require_session(sid, at(t2 + timeout + 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthenticated(UnauthenticatedReason::Expired)
    ));
    assert!(h.sessions.is_empty().await);
    assert!(
        h.audit_actions()
            .await
            .contains(&"session_expired".to_string())
    );

    // Afterwards the identifier is simply unknown.
    let err = h
        .state
        .auth
        .require_session(sid, at(t2 + timeout + 2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Unauthenticated(UnauthenticatedReason::NoSession)
    ));
}

#[tokio::test]
async fn test_who_am_i() {
    let h = Harness::new();
    let alice = h.add_user("alice", TEACHER_PASSWORD, Role::Teacher).await;
    let outcome = h
        .state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();

    let (user, token) = h
        .state
        .auth
        .who_am_i(Some(&outcome.session.id), at(1))
        .await
        .unwrap();
    assert_eq!(user.id, alice.id);
    assert_eq!(user.role, Role::Teacher);
    assert_eq!(token, outcome.session.csrf_token);

    assert!(matches!(
        h.state.auth.who_am_i(None, at(1)).await,
        Err(AuthError::Unauthenticated(UnauthenticatedReason::NoSession))
    ));
}

#[tokio::test]
async fn test_audit_and_ledger_outages_do_not_block_login() {
    let users = MemoryUserRepository::new();
    let hasher = test_hasher();
    common::add_user_to(&users, &*hasher, "alice", TEACHER_PASSWORD, Role::Teacher).await;

    let state = Harness::with_backends(Backends {
        users: Arc::new(users),
        attempts: Arc::new(WriteFailingAttempts::default()),
        audit: Arc::new(FailingAudit),
        sessions: Arc::new(MemorySessionStore::new()),
        hasher,
    });

    let outcome = state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap();
    assert!(
        state
            .auth
            .require_session(Some(&outcome.session.id), at(1))
            .await
            .is_ok()
    );

    assert!(matches!(
        state
            .auth
            .login(login_request("alice", "wrong"), at(2))
            .await,
        Err(AuthError::InvalidCredentials)
    ));
    state
        .auth
        .logout(Some(&outcome.session.id), ORIGIN, at(3))
        .await;
}

#[tokio::test]
async fn test_unreadable_ledger_fails_closed() {
    let users = MemoryUserRepository::new();
    let hasher = test_hasher();
    common::add_user_to(&users, &*hasher, "alice", TEACHER_PASSWORD, Role::Teacher).await;

    let state = Harness::with_backends(Backends {
        users: Arc::new(users),
        attempts: Arc::new(UnreadableAttempts),
        audit: Arc::new(FailingAudit),
        sessions: Arc::new(MemorySessionStore::new()),
        hasher,
    });

    let err = state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal(_)));
    assert_eq!(err.user_message(), MSG_SERVER_ERROR);
}

#[tokio::test]
async fn test_user_store_outage_is_a_server_error() {
    let h = Harness::new();
    let state = Harness::with_backends(Backends {
        users: Arc::new(FailingUsers),
        attempts: Arc::new(h.attempts.clone()),
        audit: Arc::new(h.audit.clone()),
        sessions: Arc::new(h.sessions.clone()),
        hasher: test_hasher(),
    });

    let err = state
        .auth
        .login(login_request("alice", TEACHER_PASSWORD), at(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal(_)));
    assert_eq!(err.user_message(), MSG_SERVER_ERROR);
    assert!(h.attempts.all().await.is_empty());
}
