//! Bearer token session middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves it to a live
//! session and active user, refreshes the session's last_activity, and
//! injects `ActorContext` for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Local;

use crate::api::error::ApiError;
use crate::api::types::{ActorContext, ApiContext};
use crate::auth;
use crate::db::repository;

pub async fn require_session(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let actor = {
        let conn = ctx.state.lock_db()?;
        let session = auth::session_for_token(&conn, &token)?.ok_or(ApiError::Unauthorized)?;
        let user = repository::get_user(&conn, &session.user_id)?
            .filter(|u| u.is_active)
            .ok_or(ApiError::Unauthorized)?;
        repository::touch_session(&conn, &session.id, Local::now().naive_local())?;
        ActorContext {
            user_id: user.id,
            session_id: session.id,
            role: user.role,
        }
    }; // MutexGuard dropped before the .await below

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// Admin gate for user-management routes. Runs inside `require_session`,
/// so the actor is already present.
pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    let allowed = req
        .extensions()
        .get::<ActorContext>()
        .map(|actor| actor.role.is_admin())
        .unwrap_or(false);
    if allowed {
        next.run(req).await
    } else {
        ApiError::Forbidden.into_response()
    }
}
