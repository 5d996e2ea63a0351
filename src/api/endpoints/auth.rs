//! Authentication and user administration endpoints.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now;
use crate::api::error::ApiError;
use crate::api::types::{ActorContext, ApiContext};
use crate::auth;
use crate::models::{User, UserSession};

fn request_meta(headers: &HeaderMap) -> auth::RequestMeta {
    auth::RequestMeta {
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
        user_agent: headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = ctx.state.lock_db()?;
    let outcome = auth::login(&conn, &req.email, &req.password, &request_meta(&headers), now())?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        user: outcome.user,
    }))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    auth::end_session(&conn, &actor.user_id, &actor.session_id)?;
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
    pub new_password: String,
}

/// `POST /api/auth/password-reset` — unauthenticated; always answers the
/// same way so email existence is not observable.
pub async fn password_reset(
    State(ctx): State<ApiContext>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    auth::reset_password(&conn, &req.email, &req.new_password)?;
    Ok(Json(serde_json::json!({ "reset": true })))
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

/// `POST /api/auth/password-change`
pub async fn password_change(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Json(req): Json<PasswordChangeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    auth::change_password(&conn, &actor.user_id, &req.current_password, &req.new_password)?;
    Ok(Json(serde_json::json!({ "changed": true })))
}

/// `GET /api/auth/sessions` — the caller's live sessions.
pub async fn sessions(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<Vec<UserSession>>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(auth::list_sessions(&conn, &actor.user_id)?))
}

/// `DELETE /api/auth/sessions/:id` — remote logout of one session.
pub async fn end_session(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    auth::end_session(&conn, &actor.user_id, &id)?;
    Ok(Json(serde_json::json!({ "ended": true })))
}

/// `GET /api/auth/me` — the caller's own profile.
pub async fn me(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<User>, ApiError> {
    let conn = ctx.state.lock_db()?;
    let user = crate::db::repository::get_user(&conn, &actor.user_id)?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(Json(user))
}

/// `PUT /api/auth/me`
pub async fn update_me(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
    Json(input): Json<auth::ProfileInput>,
) -> Result<Json<User>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(auth::update_profile(&conn, &actor.user_id, &input)?))
}

/// `POST /api/auth/theme-toggle`
pub async fn theme_toggle(
    State(ctx): State<ApiContext>,
    Extension(actor): Extension<ActorContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.state.lock_db()?;
    let dark = auth::toggle_theme(&conn, &actor.user_id)?;
    Ok(Json(serde_json::json!({ "use_dark_theme": dark })))
}

/// `GET /api/auth/users` — admin only.
pub async fn list_users(State(ctx): State<ApiContext>) -> Result<Json<Vec<User>>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(auth::list_users(&conn)?))
}

/// `POST /api/auth/users` — admin only.
pub async fn create_user(
    State(ctx): State<ApiContext>,
    Json(input): Json<auth::NewUserInput>,
) -> Result<Json<User>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(auth::create_user(&conn, &input, now())?))
}

/// `PUT /api/auth/users/:id` — admin only.
pub async fn update_user(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(input): Json<auth::UpdateUserInput>,
) -> Result<Json<User>, ApiError> {
    let conn = ctx.state.lock_db()?;
    Ok(Json(auth::update_user(&conn, &id, &input)?))
}
