//! Static positioning for fixed installations

use inkloc_core::config::FixedPositionConfig;
use inkloc_core::domain::StrategyError;
use inkloc_core::ports::{IPositionProvider, Position, PositionOptions};
use tokio_util::sync::CancellationToken;

/// Answers every request with the same configured fix
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionProvider {
    position: Position,
}

impl FixedPositionProvider {
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

impl From<FixedPositionConfig> for FixedPositionProvider {
    fn from(config: FixedPositionConfig) -> Self {
        Self::new(Position {
            latitude: config.latitude,
            longitude: config.longitude,
            accuracy_m: config.accuracy_m,
        })
    }
}

#[async_trait::async_trait]
impl IPositionProvider for FixedPositionProvider {
    async fn current_position(
        &self,
        _options: PositionOptions,
        cancel: CancellationToken,
    ) -> Result<Position, StrategyError> {
        if cancel.is_cancelled() {
            return Err(StrategyError::Cancelled);
        }
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn options() -> PositionOptions {
        PositionOptions {
            high_accuracy: false,
            timeout: Duration::from_secs(8),
        }
    }

    #[tokio::test]
    async fn test_returns_configured_fix() {
        let provider = FixedPositionProvider::from(FixedPositionConfig {
            latitude: 39.0993,
            longitude: -76.8483,
            accuracy_m: 20.0,
        });

        let position = provider
            .current_position(options(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(position.latitude, 39.0993);
        assert_eq!(position.accuracy_m, 20.0);
    }

    #[tokio::test]
    async fn test_cancelled_request_fails() {
        let provider = FixedPositionProvider::new(Position {
            latitude: 0.0,
            longitude: 0.0,
            accuracy_m: 1.0,
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = provider.current_position(options(), cancel).await.unwrap_err();
        assert_eq!(err, StrategyError::Cancelled);
    }
}
