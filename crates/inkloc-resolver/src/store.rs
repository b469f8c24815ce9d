//! Typed access to the persisted records
//!
//! [`LocationStore`] maps the cache record, the cumulative metrics and the
//! user preferences onto their well-known keys in an [`IKeyValueStore`].
//! Values are plain JSON. An absent key reads as `None`.

use std::sync::Arc;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use inkloc_core::config::StorageKeys;
use inkloc_core::domain::{CacheRecord, Metrics, UserPreferences};
use inkloc_core::ports::IKeyValueStore;

/// Persistence of the records owned by the resolver
#[derive(Clone)]
pub struct LocationStore {
    kv: Arc<dyn IKeyValueStore>,
    keys: StorageKeys,
}

impl LocationStore {
    pub fn new(kv: Arc<dyn IKeyValueStore>, keys: StorageKeys) -> Self {
        Self { kv, keys }
    }

    /// Reads the last persisted cache record regardless of its age
    pub async fn load_cache(&self) -> anyhow::Result<Option<CacheRecord>> {
        self.read_json(&self.keys.cache).await
    }

    pub async fn save_cache(&self, record: &CacheRecord) -> anyhow::Result<()> {
        self.write_json(&self.keys.cache, record).await
    }

    pub async fn load_metrics(&self) -> anyhow::Result<Option<Metrics>> {
        self.read_json(&self.keys.metrics).await
    }

    pub async fn save_metrics(&self, metrics: &Metrics) -> anyhow::Result<()> {
        self.write_json(&self.keys.metrics, metrics).await
    }

    pub async fn load_preferences(&self) -> anyhow::Result<Option<UserPreferences>> {
        self.read_json(&self.keys.preferences).await
    }

    pub async fn save_preferences(&self, preferences: &UserPreferences) -> anyhow::Result<()> {
        self.write_json(&self.keys.preferences, preferences).await
    }

    /// Removes the cache record and the metrics; preferences are kept
    pub async fn clear(&self) -> anyhow::Result<()> {
        self.kv
            .remove(&self.keys.cache)
            .await
            .with_context(|| format!("Failed to remove '{}'", self.keys.cache))?;
        self.kv
            .remove(&self.keys.metrics)
            .await
            .with_context(|| format!("Failed to remove '{}'", self.keys.metrics))?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let Some(raw) = self
            .kv
            .get(key)
            .await
            .with_context(|| format!("Failed to read '{key}'"))?
        else {
            debug!(key, "No persisted value");
            return Ok(None);
        };
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed JSON under '{key}'"))?;
        Ok(Some(value))
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        self.kv
            .set(key, &raw)
            .await
            .with_context(|| format!("Failed to write '{key}'"))
    }
}
