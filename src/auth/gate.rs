//! The per-request authentication entry point.

use tracing::debug;

use super::bearer::parse_bearer;
use super::types::Caller;
use crate::error::AuthError;
use crate::jwt::{JwtError, TokenType};
use crate::session::SessionManager;

/// Resolves raw `Authorization` values to callers.
///
/// Access tokens are never looked up in storage, so revoking a session does
/// not cut off access tokens already minted from it; they run out on their
/// own short lifetime.
#[derive(Clone)]
pub struct AuthGate {
    sessions: SessionManager,
}

impl AuthGate {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Authenticate with an access token. Purely stateless.
    pub fn authenticate(&self, raw: Option<&str>) -> Result<Caller, AuthError> {
        let token = raw.and_then(parse_bearer).ok_or(AuthError::MissingToken)?;

        let claims = self
            .sessions
            .jwt()
            .verify(token, TokenType::Access)
            .map_err(|e| {
                debug!(error = %e, "Access token rejected");
                AuthError::from(e)
            })?;

        Ok(Caller::from_claims(&claims))
    }

    /// Authenticate with an access token or a live refresh token.
    ///
    /// A refresh token is only accepted while its session exists and is not
    /// blacklisted, and the resulting caller carries the session's JTI.
    pub async fn authenticate_session(&self, raw: Option<&str>) -> Result<Caller, AuthError> {
        let token = raw.and_then(parse_bearer).ok_or(AuthError::MissingToken)?;
        let jwt = self.sessions.jwt();

        match jwt.verify(token, TokenType::Access) {
            Ok(claims) => return Ok(Caller::from_claims(&claims)),
            Err(JwtError::WrongTokenType) => {}
            Err(e) => {
                debug!(error = %e, "Bearer token rejected");
                return Err(e.into());
            }
        }

        let claims = jwt.verify(token, TokenType::Refresh).map_err(|e| {
            debug!(error = %e, "Refresh bearer rejected");
            AuthError::from(e)
        })?;
        let jti = claims.jti.as_deref().ok_or(AuthError::InvalidToken)?;

        if !self.sessions.is_session_live(claims.user_id, jti).await? {
            debug!(user_id = claims.user_id, jti = %jti, "Refresh bearer has no live session");
            return Err(AuthError::InvalidToken);
        }

        Ok(Caller::from_claims(&claims))
    }

    /// JTI of the session the raw value belongs to, if it is a valid refresh token.
    ///
    /// Only the signature, expiry and type are checked here.
    pub fn current_session_jti(&self, raw: Option<&str>) -> Option<String> {
        let token = raw.and_then(parse_bearer)?;
        self.sessions
            .jwt()
            .verify(token, TokenType::Refresh)
            .ok()
            .and_then(|claims| claims.jti)
    }
}
