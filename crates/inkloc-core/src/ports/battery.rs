//! Battery level port

/// Port trait for reading the battery charge level
#[async_trait::async_trait]
pub trait IBatteryMonitor: Send + Sync {
    /// Current charge as a fraction in `0.0..=1.0`
    ///
    /// Returns `Ok(None)` when the level is momentarily unknown.
    async fn level(&self) -> anyhow::Result<Option<f64>>;
}
