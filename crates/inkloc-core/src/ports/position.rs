//! On-device positioning port (driven/secondary port)
//!
//! ## Design Notes
//!
//! - Returns [`StrategyError`] rather than `anyhow` because the resolver
//!   classifies every failure into the error histogram.
//! - The caller enforces the overall timeout; `options.timeout` is passed
//!   through so platform APIs can honour it natively.
//! - Implementations must return promptly with `StrategyError::Cancelled`
//!   once `cancel` fires.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::StrategyError;

/// A raw position fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy_m: f64,
}

/// Options for a single positioning request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Standard accuracy is used for scheduled resolution
    pub high_accuracy: bool,
    pub timeout: Duration,
}

/// Port trait for on-device positioning
#[async_trait::async_trait]
pub trait IPositionProvider: Send + Sync {
    /// Requests the current position
    async fn current_position(
        &self,
        options: PositionOptions,
        cancel: CancellationToken,
    ) -> Result<Position, StrategyError>;
}
