//! Error taxonomy shared by the codec, stores, session manager and gate.
//!
//! Expected outcomes (bad, expired or revoked tokens, missing sessions) are
//! ordinary variants. Only `Storage` and `Signing` describe faults. The HTTP
//! status for each variant is decided in `api::error`, nowhere else.

use thiserror::Error;

use crate::jwt::JwtError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no bearer token supplied")]
    MissingToken,

    #[error("token is malformed or has a bad signature")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("refresh token was rejected")]
    InvalidGrant,

    #[error("caller may not manage these sessions")]
    PermissionDenied,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("current session could not be determined from the bearer token")]
    CannotDetermineCurrentSession,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("failed to sign token: {0}")]
    Signing(JwtError),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AuthError::ExpiredToken,
            JwtError::Decoding(_) | JwtError::WrongTokenType | JwtError::MalformedClaims(_) => {
                AuthError::InvalidToken
            }
            JwtError::Encoding(_) | JwtError::TimeError => AuthError::Signing(e),
        }
    }
}
