//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::bearer::{RawBearer, find_bearer};
use super::state::HasAuthGate;
use super::types::Caller;
use crate::api::ApiError;

fn raw_bearer(parts: &Parts) -> Option<RawBearer> {
    find_bearer(&parts.headers, parts.uri.query())
}

/// The bearer value of the request, if any, without validating it.
pub struct Bearer(pub Option<RawBearer>);

impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Bearer(raw_bearer(parts)))
    }
}

/// Extractor for endpoints that require an access token.
/// Stateless: no storage lookup happens.
pub struct Auth(pub Caller);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthGate + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = raw_bearer(parts);
        state
            .gate()
            .authenticate(bearer.as_ref().map(|b| b.token.as_str()))
            .map(Auth)
            .map_err(ApiError::from)
    }
}

/// Extractor for session management endpoints.
/// Accepts an access token or a live refresh token; the latter identifies
/// the caller's current session.
pub struct SessionAuth(pub Caller);

impl<S> FromRequestParts<S> for SessionAuth
where
    S: HasAuthGate + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = raw_bearer(parts);
        state
            .gate()
            .authenticate_session(bearer.as_ref().map(|b| b.token.as_str()))
            .await
            .map(SessionAuth)
            .map_err(ApiError::from)
    }
}
