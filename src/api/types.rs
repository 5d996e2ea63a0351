//! Shared types for the API layer.

use std::sync::Arc;

use uuid::Uuid;

use crate::core_state::AppState;
use crate::models::enums::Role;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<AppState>,
}

impl ApiContext {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

/// Authenticated caller, injected into request extensions by the auth
/// middleware after session validation.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
}
