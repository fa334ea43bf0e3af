//! Security audit logging
//!
//! Writes are best-effort: a failed append is retried once and then reported
//! on the operator log, never to the caller.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::StoreResult;
use crate::models::AuditEntry;
use crate::repositories::AuditRepository;

#[derive(Clone)]
pub struct AuditLogger {
    repository: Arc<dyn AuditRepository>,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Record an event. Never fails.
    pub async fn log(&self, entry: AuditEntry) {
        info!(
            target: "sims_auth::audit",
            action = %entry.action,
            actor = ?entry.actor_id,
            target_type = ?entry.target_type,
            target_id = ?entry.target_id,
            origin = ?entry.origin,
            detail = ?entry.detail,
            "audit event"
        );

        if let Err(first) = self.repository.append(&entry).await {
            warn!("Audit write for {} failed, retrying: {}", entry.action, first);
            if let Err(second) = self.repository.append(&entry).await {
                error!(
                    "Dropped audit entry {} (actor {:?}): {}",
                    entry.action, entry.actor_id, second
                );
            }
        }
    }

    /// Most recent entries, newest first
    pub async fn recent(&self, limit: u32) -> StoreResult<Vec<AuditEntry>> {
        self.repository.recent(limit).await
    }

    pub async fn count(&self) -> StoreResult<u64> {
        self.repository.count().await
    }
}
