//! Admin API endpoints.
//!
//! All endpoints require elevated privilege.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use super::AuthState;
use super::error::ApiError;
use super::sessions::SessionInfo;
use crate::auth::SessionAuth;
use crate::clock::format_timestamp;

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/sessions", get(list_active_users))
        .with_state(state)
}

#[derive(Serialize)]
struct ActiveUserInfo {
    user_id: i64,
    username: Option<String>,
    session_count: usize,
    last_active: String,
    sessions: Vec<SessionInfo>,
}

#[derive(Serialize)]
struct ActiveUsersResponse {
    users: Vec<ActiveUserInfo>,
    total: usize,
}

/// List every user with a live session, most recently active first.
async fn list_active_users(
    State(state): State<AuthState>,
    SessionAuth(caller): SessionAuth,
) -> Result<impl IntoResponse, ApiError> {
    let users: Vec<ActiveUserInfo> = state
        .sessions
        .list_all_active_users(&caller)
        .await?
        .into_iter()
        .map(|user| ActiveUserInfo {
            user_id: user.user_id,
            username: user.username,
            session_count: user.sessions.len(),
            last_active: format_timestamp(user.last_active),
            sessions: user
                .sessions
                .into_iter()
                .map(|session| SessionInfo::new(session, &caller))
                .collect(),
        })
        .collect();

    Ok(Json(ActiveUsersResponse {
        total: users.len(),
        users,
    }))
}
