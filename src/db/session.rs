//! Per-user refresh token sessions.
//!
//! Every query is scoped by `user_id` except the administrative scan and the
//! expiry sweep. Expired rows are invisible to reads even before the sweep
//! removes them.

use sqlx::sqlite::SqlitePool;

use crate::clock::now_secs;

/// One issued refresh token in circulation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Session {
    pub jti: String,
    pub user_id: i64,
    pub created_at: i64,
    pub last_active_at: i64,
    pub expires_at: i64,
}

/// Store for managing refresh token sessions.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a new session. `last_active_at` starts at `created_at`.
    pub async fn create(
        &self,
        user_id: i64,
        jti: &str,
        created_at: i64,
        expires_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sessions (jti, user_id, created_at, last_active_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(jti)
        .bind(user_id)
        .bind(created_at)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get one live session of a user.
    pub async fn get(&self, user_id: i64, jti: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT jti, user_id, created_at, last_active_at, expires_at FROM sessions WHERE user_id = ? AND jti = ? AND expires_at > ?",
        )
        .bind(user_id)
        .bind(jti)
        .bind(now_secs())
        .fetch_optional(&self.pool)
        .await
    }

    /// List the live sessions of a user, oldest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT jti, user_id, created_at, last_active_at, expires_at FROM sessions WHERE user_id = ? AND expires_at > ? ORDER BY created_at, id",
        )
        .bind(user_id)
        .bind(now_secs())
        .fetch_all(&self.pool)
        .await
    }

    /// List every live session of every user, grouped by user and oldest first.
    /// Administrative only: this scans the whole table.
    pub async fn list_all(&self) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT jti, user_id, created_at, last_active_at, expires_at FROM sessions WHERE expires_at > ? ORDER BY user_id, created_at, id",
        )
        .bind(now_secs())
        .fetch_all(&self.pool)
        .await
    }

    /// Bump `last_active_at` to now. Returns false if the session does not
    /// exist or has expired.
    ///
    /// Concurrent touches of the same session never move the timestamp
    /// backwards.
    pub async fn touch(&self, user_id: i64, jti: &str) -> Result<bool, sqlx::Error> {
        let now = now_secs();
        let result = sqlx::query(
            "UPDATE sessions SET last_active_at = MAX(last_active_at, ?) WHERE user_id = ? AND jti = ? AND expires_at > ?",
        )
        .bind(now)
        .bind(user_id)
        .bind(jti)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one session and return it, or `None` if it was already gone.
    /// Removing a missing session is not an error.
    pub async fn remove(&self, user_id: i64, jti: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as(
            "DELETE FROM sessions WHERE user_id = ? AND jti = ? RETURNING jti, user_id, created_at, last_active_at, expires_at",
        )
        .bind(user_id)
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete all sessions for a user (logout everywhere), returning what was removed.
    pub async fn remove_all(&self, user_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "DELETE FROM sessions WHERE user_id = ? RETURNING jti, user_id, created_at, last_active_at, expires_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Delete all sessions for a user except `keep_jti`, returning what was removed.
    pub async fn remove_all_except(
        &self,
        user_id: i64,
        keep_jti: &str,
    ) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "DELETE FROM sessions WHERE user_id = ? AND jti != ? RETURNING jti, user_id, created_at, last_active_at, expires_at",
        )
        .bind(user_id)
        .bind(keep_jti)
        .fetch_all(&self.pool)
        .await
    }

    /// Delete all expired sessions.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
