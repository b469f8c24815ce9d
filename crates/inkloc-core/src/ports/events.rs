//! Telemetry event sink port ("report an event")
//!
//! Reporting is synchronous and must never block or fail the caller; sinks
//! swallow and log their own errors.

use serde::Serialize;

use crate::domain::{LocationSource, Strategy, StrategyErrorKind};

/// Events emitted by the resolver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A resolution attempt produced a location
    LocationResolved {
        source: LocationSource,
        /// Latency of the whole attempt in milliseconds
        duration_ms: u64,
        changed: bool,
    },
    /// A single strategy failed and the chain fell through
    StrategyFailed {
        strategy: Strategy,
        kind: StrategyErrorKind,
    },
    /// Every strategy failed
    ResolutionFailed { consecutive_failures: u32 },
    /// Cache and metrics were cleared by the operator
    CacheCleared,
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::LocationResolved { .. } => "location_resolved",
            TelemetryEvent::StrategyFailed { .. } => "strategy_failed",
            TelemetryEvent::ResolutionFailed { .. } => "resolution_failed",
            TelemetryEvent::CacheCleared => "cache_cleared",
        }
    }
}

/// Port trait for the telemetry sink
pub trait IEventSink: Send + Sync {
    fn report(&self, event: &TelemetryEvent);
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl IEventSink for NoopEventSink {
    fn report(&self, _event: &TelemetryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_tag() {
        let event = TelemetryEvent::StrategyFailed {
            strategy: Strategy::Gps,
            kind: StrategyErrorKind::Timeout,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "strategy_failed");
        assert_eq!(json["kind"], "timeout");
        assert_eq!(event.name(), "strategy_failed");
    }
}
