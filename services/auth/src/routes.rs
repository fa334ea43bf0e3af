//! Portal HTTP routes

use axum::{
    Extension, Form, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::accounts::CreateUser;
use crate::authz::Requirement;
use crate::error::{AuthError, MSG_NOT_AUTHENTICATED};
use crate::middleware::{ClientOrigin, Gate, protect, session_id};
use crate::models::{Role, UserId};
use crate::service::{LoginRequest, SessionContext};
use crate::state::AppState;

/// Login form fields; missing fields arrive empty and are rejected by the service
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u32>,
}

const ROLE_PAGES: [(&str, Role); 5] = [
    ("/portal/student", Role::Student),
    ("/portal/teacher", Role::Teacher),
    ("/portal/admin", Role::SystemAdmin),
    ("/portal/registrar", Role::RegistrarOfficer),
    ("/portal/transcript", Role::TranscriptOfficer),
];

/// Create the router for the portal
pub fn create_router(state: AppState) -> Router {
    let mut pages: Router<AppState> = Router::new()
        .route("/portal/dashboard", get(portal_page))
        .route_layer(from_fn_with_state(
            Gate::page(&state, Requirement::AtLeast(Role::Student)),
            protect,
        ));
    for (path, role) in ROLE_PAGES {
        pages = pages.merge(
            Router::new()
                .route(path, get(portal_page))
                .route_layer(from_fn_with_state(
                    Gate::page(&state, Requirement::Exactly(role)),
                    protect,
                )),
        );
    }

    let admin = Router::new()
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/:id", axum::routing::delete(delete_user))
        .route("/admin/users/:id/active", post(set_active))
        .route("/admin/users/:id/role", post(change_role))
        .route("/admin/users/:id/password", post(reset_password))
        .route("/admin/audit", get(recent_audit))
        .route_layer(from_fn_with_state(
            Gate::api(&state, Requirement::Exactly(Role::SystemAdmin)),
            protect,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/whoami", get(who_am_i))
        .merge(pages)
        .merge(admin)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "sims-auth"
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AuthError> {
    let cookie_name = state.config.session.cookie_name.clone();
    let request = LoginRequest {
        username: form.username,
        password: form.password,
        origin,
        previous_session: jar.get(&cookie_name).map(|c| c.value().to_string()),
    };

    let outcome = state.auth.login(request, Utc::now()).await?;

    let cookie = Cookie::build((cookie_name, outcome.session.id.clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(state.config.session.cookie_secure);

    Ok((
        jar.add(cookie),
        Json(json!({
            "ok": true,
            "redirect": outcome.redirect,
            "csrf_token": outcome.session.csrf_token,
            "user": outcome.user,
        })),
    ))
}

/// Always succeeds, with or without a live session
pub async fn logout(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    jar: CookieJar,
) -> impl IntoResponse {
    let cookie_name = state.config.session.cookie_name.clone();
    let id = jar.get(&cookie_name).map(|c| c.value().to_string());

    state.auth.logout(id.as_deref(), &origin, Utc::now()).await;

    let removal = Cookie::build((cookie_name, String::new())).path("/");
    (jar.remove(removal), Json(json!({ "ok": true })))
}

pub async fn who_am_i(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Response {
    let id = session_id(&headers, &state.config.session.cookie_name);

    match state.auth.who_am_i(id.as_deref(), Utc::now()).await {
        Ok((user, csrf_token)) => Json(json!({
            "ok": true,
            "user": user,
            "csrf_token": csrf_token,
        }))
        .into_response(),
        Err(AuthError::Unauthenticated(_)) => Json(json!({
            "ok": false,
            "message": MSG_NOT_AUTHENTICATED,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Landing data for a portal page; rendering happens client-side
pub async fn portal_page(uri: Uri, Extension(context): Extension<SessionContext>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "page": uri.path(),
        "user": context.user.public(),
        "csrf_token": context.session.csrf_token,
    }))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AuthError> {
    let users = state.accounts.list_users().await?;
    Ok(Json(json!({ "ok": true, "users": users })))
}

pub async fn create_user(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    Extension(actor): Extension<SessionContext>,
    Json(request): Json<CreateUser>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .accounts
        .create_user(&actor, request, &origin, Utc::now())
        .await?;
    info!("Account {} created via admin API", user.id);
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "user": user }))))
}

pub async fn set_active(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    Extension(actor): Extension<SessionContext>,
    Path(id): Path<UserId>,
    Json(request): Json<SetActiveRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .accounts
        .set_active(&actor, id, request.active, &origin, Utc::now())
        .await?;
    Ok(Json(json!({ "ok": true, "user": user })))
}

pub async fn change_role(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    Extension(actor): Extension<SessionContext>,
    Path(id): Path<UserId>,
    Json(request): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .accounts
        .change_role(&actor, id, request.role, &origin, Utc::now())
        .await?;
    Ok(Json(json!({ "ok": true, "user": user })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    Extension(actor): Extension<SessionContext>,
    Path(id): Path<UserId>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    state
        .accounts
        .reset_password(&actor, id, &request.password, &origin, Utc::now())
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    Extension(actor): Extension<SessionContext>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, AuthError> {
    state
        .accounts
        .delete_user(&actor, id, &origin, Utc::now())
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn recent_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AuthError> {
    let entries = state.accounts.recent_audit(query.limit).await?;
    let total = state.accounts.audit_count().await?;
    Ok(Json(json!({ "ok": true, "total": total, "entries": entries })))
}
