//! Audit log repository for database operations

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::AuditRepository;
use crate::error::StoreResult;
use crate::models::{AuditAction, AuditEntry};

/// PostgreSQL-backed audit log
#[derive(Clone)]
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details, ip_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(&entry.target_type)
        .bind(entry.target_id)
        .bind(&entry.detail)
        .bind(&entry.origin)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, action, entity_type, entity_id, details, ip_address, created_at
            FROM audit_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<AuditEntry> {
                let action: String = row.try_get("action")?;
                Ok(AuditEntry {
                    actor_id: row.try_get("user_id")?,
                    action: AuditAction::from(action),
                    target_type: row.try_get("entity_type")?,
                    target_id: row.try_get("entity_id")?,
                    detail: row.try_get("details")?,
                    origin: row.try_get("ip_address")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
