//! Consent gate for on-device positioning
//!
//! [`ConsentGate::has_consent`] is evaluated on every attempt and is never
//! cached, so a revocation or an expiry takes effect on the next cycle. A
//! store failure reads as "no consent"; the resolver then falls through to
//! the next strategy.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use inkloc_core::domain::ConsentRecord;
use inkloc_core::ports::{IConsentStore, IKeyValueStore};

/// Decides whether on-device positioning may run
#[derive(Clone)]
pub struct ConsentGate {
    store: Arc<dyn IConsentStore>,
    max_age: Duration,
}

impl ConsentGate {
    pub fn new(store: Arc<dyn IConsentStore>, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Returns true if a location grant exists and is no older than the max age
    pub async fn has_consent(&self) -> bool {
        self.has_consent_at(Utc::now()).await
    }

    pub async fn has_consent_at(&self, now: DateTime<Utc>) -> bool {
        match self.store.load().await {
            Ok(Some(record)) => {
                let granted = record.grants_location(now, self.max_age);
                debug!(
                    location = record.location,
                    timestamp = record.timestamp,
                    granted,
                    "Evaluated consent record"
                );
                granted
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read consent record, treating as absent");
                false
            }
        }
    }
}

// ============================================================================
// KeyValueConsentStore
// ============================================================================

/// Reads the consent record from a key in the local key-value store
///
/// The consent manager owns the value. [`grant`](Self::grant) and
/// [`revoke`](Self::revoke) exist for operator tooling that stands in for
/// that manager; they keep any other consent categories intact.
#[derive(Clone)]
pub struct KeyValueConsentStore {
    kv: Arc<dyn IKeyValueStore>,
    key: String,
}

impl KeyValueConsentStore {
    pub fn new(kv: Arc<dyn IKeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// Records a location grant stamped with the current time
    pub async fn grant(&self) -> anyhow::Result<ConsentRecord> {
        self.write_location(true).await
    }

    /// Withdraws the location grant
    pub async fn revoke(&self) -> anyhow::Result<ConsentRecord> {
        self.write_location(false).await
    }

    async fn write_location(&self, granted: bool) -> anyhow::Result<ConsentRecord> {
        let now = Utc::now();
        let record = match self.load().await {
            Ok(Some(mut existing)) => {
                existing.location = granted;
                existing.timestamp = now.timestamp_millis();
                existing
            }
            _ => ConsentRecord::location(granted, now),
        };
        let raw = serde_json::to_string(&record)?;
        self.kv
            .set(&self.key, &raw)
            .await
            .with_context(|| format!("Failed to write '{}'", self.key))?;
        Ok(record)
    }
}

#[async_trait::async_trait]
impl IConsentStore for KeyValueConsentStore {
    async fn load(&self) -> anyhow::Result<Option<ConsentRecord>> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed consent record under '{}'", self.key))?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkloc_core::ports::MemoryKeyValueStore;

    const KEY: &str = "studio_cookie_consent";

    fn setup() -> (Arc<MemoryKeyValueStore>, KeyValueConsentStore, ConsentGate) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = KeyValueConsentStore::new(kv.clone(), KEY);
        let gate = ConsentGate::new(Arc::new(store.clone()), Duration::days(30));
        (kv, store, gate)
    }

    #[tokio::test]
    async fn test_absent_record_denies() {
        let (_, _, gate) = setup();
        assert!(!gate.has_consent().await);
    }

    #[tokio::test]
    async fn test_grant_then_revoke() {
        let (_, store, gate) = setup();
        store.grant().await.unwrap();
        assert!(gate.has_consent().await);

        store.revoke().await.unwrap();
        assert!(!gate.has_consent().await);
    }

    #[tokio::test]
    async fn test_expired_grant_denies() {
        let (kv, _, gate) = setup();
        let old = ConsentRecord::location(true, Utc::now() - Duration::days(31));
        kv.set(KEY, &serde_json::to_string(&old).unwrap())
            .await
            .unwrap();
        assert!(!gate.has_consent().await);

        let at_grant_time = Utc::now() - Duration::days(30);
        assert!(gate.has_consent_at(at_grant_time).await);
    }

    #[tokio::test]
    async fn test_malformed_record_denies() {
        let (kv, _, gate) = setup();
        kv.set(KEY, "[]").await.unwrap();
        assert!(!gate.has_consent().await);
    }

    #[tokio::test]
    async fn test_grant_preserves_other_categories() {
        let (kv, store, _) = setup();
        kv.set(KEY, r#"{"location":false,"timestamp":0,"analytics":true}"#)
            .await
            .unwrap();
        let record = store.grant().await.unwrap();
        assert!(record.location);
        assert_eq!(record.other["analytics"], serde_json::Value::Bool(true));
    }
}
