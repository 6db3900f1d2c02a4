//! Create-lock backed by the `create_locks` table.

use super::{ClaimToken, CreateLock, LockError};
use crate::db::Pool;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::time::Duration;

/// Claims a row per key. Insert wins if the key is free or its claim has
/// expired; every acquisition writes a fresh token and release deletes only
/// the row carrying the caller's token.
#[derive(Debug, Clone)]
pub struct PgCreateLock {
    pool: Pool,
}

impl PgCreateLock {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl CreateLock for PgCreateLock {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<ClaimToken>, LockError> {
        let token = ClaimToken::generate();

        let row = sqlx::query(
            r#"
            INSERT INTO create_locks (key, token, acquired_at, expires_at)
            VALUES ($1, $2, now(), now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
                SET token = EXCLUDED.token,
                    acquired_at = EXCLUDED.acquired_at,
                    expires_at = EXCLUDED.expires_at
                WHERE create_locks.expires_at < now()
            RETURNING expires_at
            "#,
        )
        .bind(key)
        .bind(token.as_str())
        .bind(ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
                tracing::debug!(key, %expires_at, "create-lock acquired");
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    async fn release(&self, key: &str, token: &ClaimToken) -> Result<(), LockError> {
        let result = sqlx::query("DELETE FROM create_locks WHERE key = $1 AND token = $2")
            .bind(key)
            .bind(token.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(key, "create-lock expired before release");
        }
        Ok(())
    }
}
