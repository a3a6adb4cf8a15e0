//! Session lifecycle: login, refresh, listing and revocation.
//!
//! This is the only place that writes to the session and blacklist stores,
//! and the only place session-management authorization is decided.
//!
//! A session is `Active` while its row exists and its JTI is not
//! blacklisted. Revoking removes the row and blacklists the JTI until the
//! refresh token's own expiry. Both revoked and expired sessions fail
//! `refresh` the same way.
//!
//! Refresh tokens are not rotated on use: the same token keeps minting
//! access tokens until it expires or is revoked.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info};

use crate::auth::{Caller, SessionPolicy};
use crate::db::{Database, Session, User};
use crate::error::AuthError;
use crate::jwt::{ExtraClaims, IssuedToken, JwtConfig, TokenType};

/// Token pair handed out at login.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    /// Session id of the refresh token
    pub jti: String,
}

/// A new access token minted from a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Expiry as unix seconds
    pub expires_at: i64,
}

/// One user's entry in the administrative session overview.
#[derive(Debug, Clone)]
pub struct ActiveUser {
    pub user_id: i64,
    /// `None` if the user is no longer in the identity directory
    pub username: Option<String>,
    pub sessions: Vec<Session>,
    /// Most recent `last_active_at` across the user's sessions
    pub last_active: i64,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
    policy: Arc<dyn SessionPolicy>,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, policy: Arc<dyn SessionPolicy>) -> Self {
        Self { db, jwt, policy }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    fn user_claims(user: &User) -> ExtraClaims {
        let mut extra = ExtraClaims::new();
        extra.insert("role".into(), json!(user.role.as_str()));
        extra.insert("username".into(), json!(user.username));
        extra
    }

    /// Issue an access/refresh pair and record the refresh token's session.
    pub async fn login(&self, user_id: i64) -> Result<LoginTokens, AuthError> {
        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("User"))?;

        let claims = Self::user_claims(&user);
        let access = self.jwt.issue(user.id, TokenType::Access, claims.clone())?;
        let refresh = self.jwt.issue(user.id, TokenType::Refresh, claims)?;
        let jti = refresh.jti.clone().ok_or(AuthError::InvalidToken)?;

        self.db
            .sessions()
            .create(user.id, &jti, refresh.issued_at, refresh.expires_at)
            .await?;

        info!(user_id = user.id, jti = %jti, "Session created");

        Ok(LoginTokens {
            access,
            refresh,
            jti,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Every failure, including storage faults, comes back as `InvalidGrant`
    /// so callers cannot tell a revoked session from an expired one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        self.try_refresh(refresh_token).await.map_err(|e| {
            match &e {
                AuthError::Storage(_) | AuthError::Signing(_) => {
                    error!(error = %e, "Refresh failed closed")
                }
                _ => debug!(error = %e, "Refresh rejected"),
            }
            AuthError::InvalidGrant
        })
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        let claims = self.jwt.verify(refresh_token, TokenType::Refresh)?;
        let jti = claims.jti.as_deref().ok_or(AuthError::InvalidToken)?;

        if self.db.blacklist().contains(jti).await? {
            info!(user_id = claims.user_id, jti = %jti, "Refresh with revoked session");
            return Err(AuthError::InvalidGrant);
        }

        if !self.db.sessions().touch(claims.user_id, jti).await? {
            info!(user_id = claims.user_id, jti = %jti, "Refresh with unknown session");
            return Err(AuthError::InvalidGrant);
        }

        let user = self
            .db
            .users()
            .get_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::NotFound("User"))?;

        let access = self
            .jwt
            .issue(user.id, TokenType::Access, Self::user_claims(&user))?;

        Ok(RefreshedAccess {
            access_token: access.token,
            expires_in: access.duration,
            expires_at: access.expires_at,
        })
    }

    /// Whether a refresh token's session still exists and is not blacklisted.
    pub async fn is_session_live(&self, user_id: i64, jti: &str) -> Result<bool, AuthError> {
        if self.db.blacklist().contains(jti).await? {
            return Ok(false);
        }
        Ok(self.db.sessions().get(user_id, jti).await?.is_some())
    }

    /// Fail unless the caller may manage `target_user_id`'s sessions.
    pub fn ensure_can_manage(&self, caller: &Caller, target_user_id: i64) -> Result<(), AuthError> {
        if self.policy.can_manage_sessions(caller, target_user_id) {
            Ok(())
        } else {
            info!(
                user_id = caller.user_id,
                target_user_id, "Session management denied"
            );
            Err(AuthError::PermissionDenied)
        }
    }

    /// Fail unless the caller holds elevated privilege.
    pub fn ensure_elevated(&self, caller: &Caller) -> Result<(), AuthError> {
        if self.policy.is_elevated(caller) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied)
        }
    }

    /// List a user's live sessions, oldest first.
    pub async fn list_sessions(
        &self,
        caller: &Caller,
        target_user_id: i64,
    ) -> Result<Vec<Session>, AuthError> {
        self.ensure_can_manage(caller, target_user_id)?;
        Ok(self.db.sessions().list(target_user_id).await?)
    }

    async fn blacklist_removed(&self, removed: &[Session]) -> Result<(), AuthError> {
        let blacklist = self.db.blacklist();
        for session in removed {
            blacklist.add(&session.jti, session.expires_at).await?;
        }
        Ok(())
    }

    /// Revoke one session. Returns false if it did not exist, which also
    /// makes a second revoke of the same JTI a harmless no-op.
    pub async fn revoke_session(&self, target_user_id: i64, jti: &str) -> Result<bool, AuthError> {
        let Some(session) = self.db.sessions().remove(target_user_id, jti).await? else {
            return Ok(false);
        };

        self.blacklist_removed(std::slice::from_ref(&session)).await?;
        info!(user_id = target_user_id, jti = %jti, "Session revoked");
        Ok(true)
    }

    /// Revoke every session of a user. Returns how many were revoked.
    pub async fn revoke_all_sessions(&self, target_user_id: i64) -> Result<u64, AuthError> {
        let removed = self.db.sessions().remove_all(target_user_id).await?;
        self.blacklist_removed(&removed).await?;

        info!(
            user_id = target_user_id,
            count = removed.len(),
            "All sessions revoked"
        );
        Ok(removed.len() as u64)
    }

    /// Revoke every session of a user except the caller's current one.
    ///
    /// `keep_jti` is `None` when the current session could not be derived from
    /// the caller's credentials. It must name a live session of the target
    /// user; otherwise nothing is revoked.
    pub async fn revoke_all_except(
        &self,
        target_user_id: i64,
        keep_jti: Option<&str>,
    ) -> Result<u64, AuthError> {
        let keep = keep_jti.ok_or(AuthError::CannotDetermineCurrentSession)?;

        let store = self.db.sessions();
        if store.get(target_user_id, keep).await?.is_none() {
            info!(
                user_id = target_user_id,
                kept = %keep,
                "Current session does not belong to target user"
            );
            return Err(AuthError::CannotDetermineCurrentSession);
        }

        let removed = store.remove_all_except(target_user_id, keep).await?;
        self.blacklist_removed(&removed).await?;

        info!(
            user_id = target_user_id,
            kept = %keep,
            count = removed.len(),
            "Other sessions revoked"
        );
        Ok(removed.len() as u64)
    }

    /// Revoke the session a refresh token belongs to.
    ///
    /// Tokens that fail verification are ignored so a client can always log
    /// out, even with a stale token.
    pub async fn logout(&self, refresh_token: &str) -> Result<bool, AuthError> {
        let claims = match self.jwt.verify(refresh_token, TokenType::Refresh) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Logout with unusable refresh token");
                return Ok(false);
            }
        };
        let Some(jti) = claims.jti.as_deref() else {
            return Ok(false);
        };

        self.revoke_session(claims.user_id, jti).await
    }

    /// Every user with at least one live session, most recently active first.
    pub async fn list_all_active_users(&self, caller: &Caller) -> Result<Vec<ActiveUser>, AuthError> {
        self.ensure_elevated(caller)?;

        let usernames: HashMap<i64, String> = self
            .db
            .users()
            .list()
            .await?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        let mut active: Vec<ActiveUser> = Vec::new();
        for session in self.db.sessions().list_all().await? {
            match active.last_mut() {
                Some(entry) if entry.user_id == session.user_id => {
                    entry.last_active = entry.last_active.max(session.last_active_at);
                    entry.sessions.push(session);
                }
                _ => active.push(ActiveUser {
                    user_id: session.user_id,
                    username: usernames.get(&session.user_id).cloned(),
                    last_active: session.last_active_at,
                    sessions: vec![session],
                }),
            }
        }

        active.sort_by(|a, b| {
            b.last_active
                .cmp(&a.last_active)
                .then(a.user_id.cmp(&b.user_id))
        });
        Ok(active)
    }
}
