//! Session management API endpoints.
//!
//! - GET `/` - List sessions of a user (self or elevated)
//! - DELETE `/` - Revoke all sessions of a user, optionally keeping the current one
//! - DELETE `/{jti}` - Revoke one session
//!
//! These accept an access token or a live refresh token. Only the latter
//! identifies the current session.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AuthState;
use super::error::ApiError;
use crate::auth::{Bearer, Caller, SessionAuth};
use crate::clock::format_timestamp;
use crate::db::Session;
use crate::error::AuthError;

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/", get(list_sessions).delete(revoke_sessions))
        .route("/{jti}", delete(revoke_session))
        .with_state(state)
}

#[derive(Deserialize)]
pub(super) struct SessionParams {
    user_id: Option<String>,
    except_current: Option<String>,
}

#[derive(Serialize)]
pub(super) struct SessionInfo {
    jti: String,
    created: String,
    last_active: String,
    expires: String,
    is_current: bool,
}

impl SessionInfo {
    pub(super) fn new(session: Session, caller: &Caller) -> Self {
        let is_current = caller.session_jti.as_deref() == Some(session.jti.as_str());
        Self {
            created: format_timestamp(session.created_at),
            last_active: format_timestamp(session.last_active_at),
            expires: format_timestamp(session.expires_at),
            jti: session.jti,
            is_current,
        }
    }
}

#[derive(Serialize)]
struct ListSessionsResponse {
    user_id: i64,
    sessions: Vec<SessionInfo>,
}

#[derive(Serialize)]
struct RevokeResponse {
    success: bool,
    message: String,
}

fn parse_user_id(raw: Option<&str>) -> Result<Option<i64>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request("invalid_parameter", "Invalid user_id")),
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// The target user, required to be present.
fn required_user_id(params: &SessionParams) -> Result<i64, ApiError> {
    parse_user_id(params.user_id.as_deref())?
        .ok_or_else(|| AuthError::MissingParameter("user_id").into())
}

/// List sessions of `user_id`, or of the caller if omitted.
async fn list_sessions(
    State(state): State<AuthState>,
    SessionAuth(caller): SessionAuth,
    Query(params): Query<SessionParams>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_user_id(params.user_id.as_deref())?.unwrap_or(caller.user_id);

    let sessions = state
        .sessions
        .list_sessions(&caller, target)
        .await?
        .into_iter()
        .map(|session| SessionInfo::new(session, &caller))
        .collect();

    Ok(Json(ListSessionsResponse {
        user_id: target,
        sessions,
    }))
}

/// Revoke every session of `user_id`. With `except_current`, the session of
/// the caller's refresh token survives.
async fn revoke_sessions(
    State(state): State<AuthState>,
    SessionAuth(caller): SessionAuth,
    Bearer(bearer): Bearer,
    Query(params): Query<SessionParams>,
) -> Result<impl IntoResponse, ApiError> {
    let target = required_user_id(&params)?;
    state.sessions.ensure_can_manage(&caller, target)?;

    let (count, kept) = if parse_flag(params.except_current.as_deref()) {
        let current = state
            .gate
            .current_session_jti(bearer.as_ref().map(|b| b.token.as_str()));
        let count = state
            .sessions
            .revoke_all_except(target, current.as_deref())
            .await?;
        (count, true)
    } else {
        (state.sessions.revoke_all_sessions(target).await?, false)
    };

    info!(
        user_id = caller.user_id,
        target_user_id = target,
        count,
        "Sessions revoked via API"
    );

    let message = if kept {
        format!("Revoked {} other session(s)", count)
    } else {
        format!("Revoked {} session(s)", count)
    };

    Ok(Json(RevokeResponse {
        success: true,
        message,
    }))
}

/// Revoke one session of `user_id`.
async fn revoke_session(
    State(state): State<AuthState>,
    SessionAuth(caller): SessionAuth,
    Path(jti): Path<String>,
    Query(params): Query<SessionParams>,
) -> Result<impl IntoResponse, ApiError> {
    let target = required_user_id(&params)?;
    state.sessions.ensure_can_manage(&caller, target)?;

    if !state.sessions.revoke_session(target, &jti).await? {
        return Err(AuthError::NotFound("Session").into());
    }

    Ok(Json(RevokeResponse {
        success: true,
        message: "Session revoked".to_string(),
    }))
}
