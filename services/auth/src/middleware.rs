//! Request plumbing: client origin, session cookie and the protected-route gate

use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{HeaderMap, Method, Request, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::authz::Requirement;
use crate::error::{AuthError, MSG_FORBIDDEN, UnauthenticatedReason};
use crate::service::CsrfCheck;
use crate::state::AppState;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const LOGIN_PAGE: &str = "/index.html";
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Client address of the request, as resolved by [`client_origin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOrigin(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientOrigin(client_origin(
            &parts.headers,
            peer,
            &state.config.server.trusted_proxies,
        )))
    }
}

/// Address recorded for throttling, sessions and the audit trail
///
/// This is the socket peer. Only when the peer is one of `trusted_proxies` is
/// the first `X-Forwarded-For` hop used instead, and only if it parses as an
/// IP address. The result is always a formatted IP address or `"unknown"`.
pub fn client_origin(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer) = peer.map(|addr| addr.ip()) else {
        return UNKNOWN_ORIGIN.to_string();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
        .to_string()
}

/// Session identifier from the named cookie
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
}

fn is_state_changing(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// How a rejected request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Browser pages: redirect to the login page
    Page,
    /// JSON endpoints: error body with status
    Api,
}

/// State for [`protect`]
#[derive(Clone)]
pub struct Gate {
    pub state: AppState,
    pub requirement: Requirement,
    pub kind: GateKind,
}

impl Gate {
    pub fn page(state: &AppState, requirement: Requirement) -> Self {
        Self {
            state: state.clone(),
            requirement,
            kind: GateKind::Page,
        }
    }

    pub fn api(state: &AppState, requirement: Requirement) -> Self {
        Self {
            state: state.clone(),
            requirement,
            kind: GateKind::Api,
        }
    }
}

/// Validate the session, check the role and, on state-changing methods,
/// the CSRF header. The resulting `SessionContext` is put in the request
/// extensions for handlers.
pub async fn protect(State(gate): State<Gate>, mut req: Request<Body>, next: Next) -> Response {
    let now = Utc::now();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let origin = client_origin(
        req.headers(),
        peer,
        &gate.state.config.server.trusted_proxies,
    );
    let session = session_id(req.headers(), &gate.state.config.session.cookie_name);
    let csrf_token = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let csrf = if is_state_changing(req.method()) {
        CsrfCheck::Require(csrf_token.as_deref())
    } else {
        CsrfCheck::Skip
    };

    let result = gate
        .state
        .auth
        .guard(session.as_deref(), gate.requirement, csrf, &origin, now)
        .await;

    match result {
        Ok(context) => {
            req.extensions_mut().insert(context);
            next.run(req).await
        }
        Err(e) if gate.kind == GateKind::Page => page_rejection(e),
        Err(e) => e.into_response(),
    }
}

fn page_rejection(error: AuthError) -> Response {
    match error {
        AuthError::Unauthenticated(UnauthenticatedReason::NoSession) => {
            Redirect::to(LOGIN_PAGE).into_response()
        }
        AuthError::Unauthenticated(UnauthenticatedReason::Expired) => {
            Redirect::to(&format!("{}?timeout=1", LOGIN_PAGE)).into_response()
        }
        AuthError::Unauthenticated(UnauthenticatedReason::Deactivated) => {
            Redirect::to(&format!("{}?deactivated=1", LOGIN_PAGE)).into_response()
        }
        AuthError::Forbidden => (StatusCode::FORBIDDEN, MSG_FORBIDDEN).into_response(),
        other => other.into_response(),
    }
}
