//! Shared error handling for API endpoints.
//!
//! This is the one place engine errors become HTTP statuses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::AuthError;

const INVALID_GRANT_DESCRIPTION: &str = "The refresh token is invalid or has expired";

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    /// Error code and description
    BadRequest(&'static str, String),
    Unauthorized(String),
    /// OAuth2 `invalid_grant`, always with the same generic description
    InvalidGrant,
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(code: &'static str, msg: impl Into<String>) -> Self {
        Self::BadRequest(code, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(..) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::InvalidGrant => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            // Expired and invalid tokens look the same from outside.
            AuthError::MissingToken => ApiError::unauthorized("Authentication required"),
            AuthError::InvalidToken | AuthError::ExpiredToken => {
                debug!(error = %e, "Token rejected");
                ApiError::unauthorized("Invalid or expired token")
            }
            AuthError::InvalidGrant => ApiError::InvalidGrant,
            AuthError::PermissionDenied => {
                ApiError::forbidden("You do not have permission to manage these sessions")
            }
            AuthError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            AuthError::MissingParameter(name) => ApiError::bad_request(
                "missing_parameter",
                format!("Missing required parameter: {}", name),
            ),
            AuthError::CannotDetermineCurrentSession => ApiError::bad_request(
                "cannot_determine_current_session",
                "Authenticate with your refresh token to keep the current session",
            ),
            AuthError::Storage(_) | AuthError::Signing(_) => {
                error!(error = %e, "Request failed");
                ApiError::internal("Internal server error")
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    error_description: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, description) = match self {
            ApiError::BadRequest(code, msg) => (code, msg),
            ApiError::Unauthorized(msg) => ("unauthorized", msg),
            ApiError::InvalidGrant => ("invalid_grant", INVALID_GRANT_DESCRIPTION.to_string()),
            ApiError::Forbidden(msg) => ("forbidden", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
        };
        (
            status,
            Json(ErrorResponse {
                error: code,
                error_description: description,
            }),
        )
            .into_response()
    }
}
