//! Consent record port
//!
//! The consent manager owns the record; this port only reads it. The
//! resolver re-reads it on every positioning attempt so a revocation takes
//! effect without a restart.

use crate::domain::ConsentRecord;

/// Port trait for reading the external consent record
#[async_trait::async_trait]
pub trait IConsentStore: Send + Sync {
    /// Loads the current record, `None` when none has been given
    async fn load(&self) -> anyhow::Result<Option<ConsentRecord>>;
}
