//! Local key-value persistence port
//!
//! Values are plain JSON strings under well-known keys. An absent key means
//! "no data". Failures are adapter-specific, hence `anyhow::Result`.

use std::collections::HashMap;
use std::sync::Mutex;

/// Port trait for local key-value persistence
#[async_trait::async_trait]
pub trait IKeyValueStore: Send + Sync {
    /// Reads a value, `None` when the key is absent
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Writes (or overwrites) a value
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Removes a key; removing an absent key is not an error
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-local store, used when no database is configured and in tests
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("key-value store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "{}").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.len(), 1);

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }
}
