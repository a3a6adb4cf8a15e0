//! Revoked session ids.
//!
//! An entry only needs to outlive the refresh token it blocks, so each row
//! carries that token's expiry. Reads ignore rows past their expiry; the
//! sweep just reclaims the space.

use sqlx::sqlite::SqlitePool;

use crate::clock::now_secs;

pub struct BlacklistStore {
    pool: SqlitePool,
}

impl BlacklistStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark `jti` revoked until `expires_at`. Adding an entry twice is a no-op.
    pub async fn add(&self, jti: &str, expires_at: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revoked_sessions (jti, expires_at, revoked_at) VALUES (?, ?, ?) ON CONFLICT(jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .bind(now_secs())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Check whether `jti` is revoked. Expired entries count as absent.
    pub async fn contains(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let (revoked,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM revoked_sessions WHERE jti = ? AND expires_at > ?)",
        )
        .bind(jti)
        .bind(now_secs())
        .fetch_one(&self.pool)
        .await?;
        Ok(revoked)
    }

    /// Delete all entries whose token could no longer be valid.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_sessions WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
