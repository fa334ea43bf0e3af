//! Redis session store
//!
//! Each session is a JSON document under `session:{id}` with a TTL of twice
//! the idle timeout, so abandoned sessions disappear without a sweep. A set
//! under `user_sessions:{user_id}` indexes a user's sessions for bulk
//! revocation. The index carries the same TTL, refreshed on every write, and
//! members whose session key has expired are pruned whenever it is read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::cache::RedisPool;
use tracing::debug;

use super::store::SessionStore;
use crate::error::StoreResult;
use crate::models::{Session, UserId};

#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// # Arguments
    /// * `redis_pool` - shared Redis connection
    /// * `idle_timeout_seconds` - session idle timeout; keys live for twice this long
    pub fn new(redis_pool: RedisPool, idle_timeout_seconds: u64) -> Self {
        Self {
            redis_pool,
            ttl_seconds: idle_timeout_seconds.saturating_mul(2).max(1),
        }
    }

    fn session_key(id: &str) -> String {
        format!("session:{}", id)
    }

    fn user_index_key(user_id: UserId) -> String {
        format!("user_sessions:{}", user_id)
    }

    /// Identifiers in the user's index whose session keys still exist.
    /// Dead members are removed from the index on the way.
    async fn live_sessions(&self, user_id: UserId) -> StoreResult<Vec<String>> {
        let index_key = Self::user_index_key(user_id);
        let members = self.redis_pool.set_members(&index_key).await?;
        let keys: Vec<String> = members.iter().map(|id| Self::session_key(id)).collect();
        let present = self.redis_pool.exists_many(&keys).await?;

        let (live, stale) = partition_members(members, &present);
        for id in &stale {
            self.redis_pool.remove_from_set(&index_key, id).await?;
        }
        if !stale.is_empty() {
            debug!("Pruned {} expired sessions from {}", stale.len(), index_key);
        }
        Ok(live)
    }
}

/// Split index members into (live, stale) by whether their session key exists.
/// Members without an answer are kept.
fn partition_members(members: Vec<String>, present: &[bool]) -> (Vec<String>, Vec<String>) {
    let mut live = Vec::with_capacity(members.len());
    let mut stale = Vec::new();
    for (i, id) in members.into_iter().enumerate() {
        if present.get(i).copied().unwrap_or(true) {
            live.push(id);
        } else {
            stale.push(id);
        }
    }
    (live, stale)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        match self.redis_pool.get(&Self::session_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        let raw = serde_json::to_string(session)?;
        self.redis_pool
            .set(&Self::session_key(&session.id), &raw, Some(self.ttl_seconds))
            .await?;
        let index_key = Self::user_index_key(session.user_id);
        self.redis_pool.add_to_set(&index_key, &session.id).await?;
        self.redis_pool.expire(&index_key, self.ttl_seconds).await?;
        self.live_sessions(session.user_id).await?;
        Ok(())
    }

    async fn touch(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>> {
        let Some(mut session) = self.get(id).await? else {
            return Ok(None);
        };
        session.last_activity = session.last_activity.max(now);

        let raw = serde_json::to_string(&session)?;
        let written = self
            .redis_pool
            .set_if_exists(&Self::session_key(id), &raw, self.ttl_seconds)
            .await?;
        if !written {
            return Ok(None);
        }

        self.redis_pool
            .expire(&Self::user_index_key(session.user_id), self.ttl_seconds)
            .await?;
        Ok(Some(session))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let existing = self.get(id).await?;
        let removed = self.redis_pool.delete(&Self::session_key(id)).await?;
        if let Some(session) = existing {
            self.redis_pool
                .remove_from_set(&Self::user_index_key(session.user_id), id)
                .await?;
        }
        Ok(removed > 0)
    }

    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        let index_key = Self::user_index_key(user_id);
        let mut removed = 0;
        for id in self.live_sessions(user_id).await? {
            removed += self.redis_pool.delete(&Self::session_key(&id)).await?;
        }
        self.redis_pool.delete(&index_key).await?;
        Ok(removed)
    }

    async fn delete_idle(&self, _idle_since: DateTime<Utc>) -> StoreResult<u64> {
        debug!("Redis sessions expire through key TTLs; nothing to sweep");
        Ok(0)
    }
}
