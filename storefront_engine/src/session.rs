use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::traits::{SessionStore, SessionStoreError};

type SessionKey = (String, String);

/// A process-local [`SessionStore`]. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    blobs: Arc<RwLock<HashMap<SessionKey, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        let blobs = self.blobs.read().await;
        let mut sessions = blobs.keys().map(|(s, _)| s.as_str()).collect::<Vec<_>>();
        sessions.sort_unstable();
        sessions.dedup();
        sessions.len()
    }
}

fn key_for(session_id: &str, key: &str) -> Result<SessionKey, SessionStoreError> {
    if session_id.trim().is_empty() {
        return Err(SessionStoreError::MissingSessionId);
    }
    Ok((session_id.to_string(), key.to_string()))
}

impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionStoreError> {
        let k = key_for(session_id, key)?;
        Ok(self.blobs.read().await.get(&k).cloned())
    }

    async fn set(&self, session_id: &str, key: &str, blob: String) -> Result<(), SessionStoreError> {
        let k = key_for(session_id, key)?;
        self.blobs.write().await.insert(k, blob);
        Ok(())
    }

    async fn clear(&self, session_id: &str, key: &str) -> Result<(), SessionStoreError> {
        let k = key_for(session_id, key)?;
        self.blobs.write().await.remove(&k);
        Ok(())
    }
}
