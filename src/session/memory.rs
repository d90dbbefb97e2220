use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

use super::{keys, SessionError, SessionStore};

/// Process-local session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, SessionError> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .and_then(|values| values.get(key))
            .cloned())
    }

    async fn put(&self, session_id: &str, key: &str, value: Value) -> Result<(), SessionError> {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn forget(&self, session_id: &str, key: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write();
        if let Some(values) = sessions.get_mut(session_id) {
            values.remove(key);
            if values.is_empty() {
                sessions.remove(session_id);
            }
        }
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions.write().remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self, now: i64) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, values| {
            !matches!(values.get(keys::EXPIRES_AT).and_then(Value::as_i64), Some(expires_at) if expires_at <= now)
        });
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_do_not_share_keys() {
        let store = MemorySessionStore::new();
        store.put("a", "active_module_code", Value::from("hr")).await.unwrap();

        assert_eq!(store.get("a", "active_module_code").await.unwrap(), Some(Value::from("hr")));
        assert_eq!(store.get("b", "active_module_code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn purge_drops_only_expired_sessions() {
        let store = MemorySessionStore::new();
        store.put("old", keys::EXPIRES_AT, Value::from(100)).await.unwrap();
        store.put("old", "active_module_code", Value::from("hr")).await.unwrap();
        store.put("live", keys::EXPIRES_AT, Value::from(500)).await.unwrap();

        assert_eq!(store.purge_expired(100).await.unwrap(), 1);
        assert_eq!(store.session_count(), 1);
        assert_eq!(store.get("old", "active_module_code").await.unwrap(), None);
        assert!(store.get("live", keys::EXPIRES_AT).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn destroy_removes_every_key() {
        let store = MemorySessionStore::new();
        store.put("a", keys::EXPIRES_AT, Value::from(500)).await.unwrap();
        store.put("a", "flash_error", Value::from("x")).await.unwrap();
        store.destroy("a").await.unwrap();
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn forgetting_last_key_drops_session() {
        let store = MemorySessionStore::new();
        store.put("a", "k", Value::from(1)).await.unwrap();
        store.forget("a", "k").await.unwrap();
        assert_eq!(store.session_count(), 0);
    }
}
