//! Authentication user types.

use crate::db::UserRole;
use crate::jwt::{Claims, TokenType};

/// Authenticated caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Subject user id from the token
    pub user_id: i64,
    /// Role claim; missing or unknown roles read as `User`
    pub role: UserRole,
    /// JTI of the session the caller proved, set only when they
    /// authenticated with a live refresh token
    pub session_jti: Option<String>,
}

impl Caller {
    pub fn from_claims(claims: &Claims) -> Self {
        let session_jti = match claims.token_type {
            TokenType::Refresh => claims.jti.clone(),
            TokenType::Access => None,
        };

        Self {
            user_id: claims.user_id,
            role: UserRole::from_str(claims.extra_str("role").unwrap_or_default()),
            session_jti,
        }
    }
}
