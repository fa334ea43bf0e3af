//! Session storage seam

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::models::{Session, UserId};

/// Process-wide session table, keyed by session identifier
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Session>>;

    /// Insert or replace
    async fn put(&self, session: &Session) -> StoreResult<()>;

    /// Move `last_activity` forward to `now` (never backwards) if the session
    /// still exists, returning the updated row.
    async fn touch(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>>;

    /// Returns whether anything was removed
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Remove every session owned by `user_id`, returning how many went
    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64>;

    /// Remove sessions whose last activity is strictly before `idle_since`
    async fn delete_idle(&self, idle_since: DateTime<Utc>) -> StoreResult<u64>;
}

/// Session table held in process memory
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn touch(&self, id: &str, now: DateTime<Utc>) -> StoreResult<Option<Session>> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.get_mut(id).map(|session| {
            session.last_activity = session.last_activity.max(now);
            session.clone()
        }))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_idle(&self, idle_since: DateTime<Utc>) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_activity >= idle_since);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::TimeDelta;

    fn session(id: &str, user_id: UserId, last_activity: DateTime<Utc>) -> Session {
        Session {
            id: id.to_string(),
            user_id,
            role: Role::Student,
            csrf_token: format!("csrf-{id}"),
            origin: None,
            created_at: last_activity,
            last_activity,
        }
    }

    #[tokio::test]
    async fn test_touch_never_moves_backwards() {
        let store = MemorySessionStore::new();
        let t0 = Utc::now();
        store.put(&session("s1", 1, t0)).await.unwrap();

        let later = store
            .touch("s1", t0 + TimeDelta::seconds(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(later.last_activity, t0 + TimeDelta::seconds(10));

        let stale = store.touch("s1", t0).await.unwrap().unwrap();
        assert_eq!(stale.last_activity, t0 + TimeDelta::seconds(10));

        assert!(store.touch("missing", t0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_user_only_hits_that_user() {
        let store = MemorySessionStore::new();
        let t0 = Utc::now();
        store.put(&session("a", 1, t0)).await.unwrap();
        store.put(&session("b", 1, t0)).await.unwrap();
        store.put(&session("c", 2, t0)).await.unwrap();

        assert_eq!(store.delete_for_user(1).await.unwrap(), 2);
        assert_eq!(store.len().await, 1);
        assert!(store.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_idle_keeps_recent_sessions() {
        let store = MemorySessionStore::new();
        let t0 = Utc::now();
        store.put(&session("old", 1, t0)).await.unwrap();
        store
            .put(&session("new", 2, t0 + TimeDelta::seconds(100)))
            .await
            .unwrap();

        assert_eq!(
            store
                .delete_idle(t0 + TimeDelta::seconds(50))
                .await
                .unwrap(),
            1
        );
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("new").await.unwrap().is_some());
        assert!(!store.delete("old").await.unwrap());
    }
}
