//! Token API endpoints.
//!
//! - GET `/test` - Report where the bearer value arrived from
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - POST `/logout` - Revoke the session of a refresh token
//! - GET `/verify` - Check an access token

use axum::{
    Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::AuthState;
use super::error::ApiError;
use crate::auth::{Auth, Bearer, parse_bearer};
use crate::error::AuthError;

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/test", get(test_auth))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/verify", get(verify_token))
        .with_state(state)
}

#[derive(Serialize)]
struct TestResponse {
    status: &'static str,
    auth_method: &'static str,
}

/// Diagnostic for deployments that strip the `Authorization` header.
/// Never validates the token.
async fn test_auth(Bearer(bearer): Bearer) -> Json<TestResponse> {
    Json(TestResponse {
        status: "ok",
        auth_method: bearer.map(|b| b.source.as_str()).unwrap_or("none"),
    })
}

#[derive(Deserialize, Default)]
struct RefreshTokenBody {
    refresh_token: Option<String>,
}

/// Read `refresh_token` from a JSON or form-encoded body.
fn refresh_token_from_body(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let token = if is_json {
        serde_json::from_slice::<RefreshTokenBody>(body)
            .ok()
            .and_then(|b| b.refresh_token)
    } else {
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "refresh_token")
            .map(|(_, value)| value.into_owned())
    };

    token.filter(|t| !t.trim().is_empty())
}

/// Read `refresh_token` from the query string.
fn refresh_token_from_query(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "refresh_token")
        .map(|(_, value)| value.into_owned())
        .filter(|t| !t.trim().is_empty())
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: i64,
    expires_at: i64,
}

/// OAuth2-style refresh. Any failure is a generic `invalid_grant`.
/// The body takes precedence over the query string.
async fn refresh_token(
    State(state): State<AuthState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = refresh_token_from_body(&headers, &body)
        .or_else(|| refresh_token_from_query(query.as_deref()))
        .ok_or(AuthError::MissingParameter("refresh_token"))?;

    let refreshed = state.sessions.refresh(token.trim()).await?;

    Ok(Json(RefreshResponse {
        access_token: refreshed.access_token,
        token_type: "Bearer",
        expires_in: refreshed.expires_in,
        expires_at: refreshed.expires_at,
    }))
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
    revoked: bool,
}

/// Revoke the session of the refresh token in the body, or of the bearer
/// value if that is a refresh token. Succeeds for stale or missing tokens.
async fn logout(
    State(state): State<AuthState>,
    Bearer(bearer): Bearer,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = refresh_token_from_body(&headers, &body)
        .or_else(|| bearer.map(|b| b.token));

    let revoked = match token {
        Some(token) => match parse_bearer(&token) {
            Some(token) => state.sessions.logout(token).await?,
            None => false,
        },
        None => false,
    };

    Ok(Json(LogoutResponse {
        success: true,
        revoked,
    }))
}

#[derive(Serialize)]
struct VerifyResponse {
    user_id: i64,
    role: &'static str,
}

/// Check that the access token is valid. Returns 200 if valid, 401 if not.
async fn verify_token(Auth(caller): Auth) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        user_id: caller.user_id,
        role: caller.role.as_str(),
    })
}
