//! PostgreSQL session table

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::store::SessionStore;
use crate::error::{StoreError, StoreResult};
use crate::models::{Role, Session, UserId};

const SESSION_COLUMNS: &str =
    "session_id, user_id, role, csrf_token, ip_address, created_at, last_activity";

/// Sessions persisted in `user_sessions`
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn session_from_row(row: &PgRow) -> StoreResult<Session> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(Session {
        id: row.try_get("session_id")?,
        user_id: row.try_get("user_id")?,
        role,
        csrf_token: row.try_get("csrf_token")?,
        origin: row.try_get("ip_address")?,
        created_at: row.try_get("created_at")?,
        last_activity: row.try_get("last_activity")?,
    })
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions WHERE session_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (session_id, user_id, role, csrf_token, ip_address, created_at, last_activity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (session_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                role = EXCLUDED.role,
                csrf_token = EXCLUDED.csrf_token,
                ip_address = EXCLUDED.ip_address,
                created_at = EXCLUDED.created_at,
                last_activity = EXCLUDED.last_activity
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.role.as_str())
        .bind(&session.csrf_token)
        .bind(&session.origin)
        .bind(session.created_at)
        .bind(session.last_activity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE user_sessions SET last_activity = GREATEST(last_activity, $2)
            WHERE session_id = $1
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE session_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_idle(&self, idle_since: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE last_activity < $1")
            .bind(idle_since)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
