mod admin;
mod error;
mod sessions;
mod tokens;

use axum::Router;

use crate::auth::{AuthGate, HasAuthGate};
use crate::session::SessionManager;

pub use error::ApiError;

/// State shared by every auth endpoint.
#[derive(Clone)]
pub struct AuthState {
    pub gate: AuthGate,
    pub sessions: SessionManager,
}

impl AuthState {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            gate: AuthGate::new(sessions.clone()),
            sessions,
        }
    }
}

impl HasAuthGate for AuthState {
    fn gate(&self) -> &AuthGate {
        &self.gate
    }
}

/// Create the API router. Paths are relative to the `/v1` namespace.
pub fn create_api_router(state: AuthState) -> Router {
    Router::new()
        .nest("/auth", tokens::router(state.clone()))
        .nest("/auth/sessions", sessions::router(state.clone()))
        .nest("/auth/users", admin::router(state))
}
