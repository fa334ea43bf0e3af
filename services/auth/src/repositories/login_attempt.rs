//! Login attempt repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::LoginAttemptRepository;
use crate::error::StoreResult;
use crate::models::LoginAttempt;

/// PostgreSQL-backed login attempt log
#[derive(Clone)]
pub struct PgLoginAttemptRepository {
    pool: PgPool,
}

impl PgLoginAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginAttemptRepository for PgLoginAttemptRepository {
    async fn record(&self, attempt: &LoginAttempt) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (username, ip_address, success, attempted_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&attempt.username)
        .bind(&attempt.origin)
        .bind(attempt.success)
        .bind(attempt.attempted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_failures_since(&self, username: &str, since: DateTime<Utc>) -> StoreResult<u32> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE LOWER(username) = LOWER($1) AND success = FALSE AND attempted_at >= $2
            "#,
        )
        .bind(username)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
