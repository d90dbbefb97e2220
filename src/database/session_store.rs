use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::session::{keys, SessionError, SessionStore};

/// Session values in the central `session_values` table, one row per key.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError> {
        let value: Option<(Value,)> = sqlx::query_as(
            "SELECT value FROM session_values WHERE session_id = $1 AND key = $2",
        )
        .bind(session_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.map(|(value,)| value))
    }

    async fn put(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO session_values (session_id, key, value, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (session_id, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(session_id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn forget(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM session_values WHERE session_id = $1 AND key = $2")
            .bind(session_id)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM session_values WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<usize, SessionError> {
        let purged: i64 = sqlx::query_scalar(
            r#"
            WITH expired AS (
                SELECT session_id FROM session_values
                WHERE key = $1 AND (value #>> '{}')::bigint <= $2
            ), removed AS (
                DELETE FROM session_values
                WHERE session_id IN (SELECT session_id FROM expired)
                RETURNING session_id
            )
            SELECT COUNT(DISTINCT session_id) FROM removed
            "#,
        )
        .bind(keys::EXPIRES_AT)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(purged as usize)
    }
}
