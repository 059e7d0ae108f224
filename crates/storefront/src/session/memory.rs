//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SessionError, SessionKey, SessionStore};

/// Session store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<SessionKey, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: SessionKey, value: String) -> Result<(), SessionError> {
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: SessionKey) -> Result<(), SessionError> {
        self.values.write().await.remove(&key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        self.values.write().await.clear();
        Ok(())
    }
}
