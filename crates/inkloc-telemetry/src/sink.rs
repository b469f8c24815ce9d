//! `IEventSink` adapter backed by [`MetricsRegistry`]

use std::sync::Arc;

use inkloc_core::ports::{IEventSink, TelemetryEvent};
use tracing::trace;

use crate::metrics::MetricsRegistry;

/// Turns resolver events into Prometheus samples
pub struct PrometheusEventSink {
    metrics: Arc<MetricsRegistry>,
}

impl PrometheusEventSink {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }
}

impl IEventSink for PrometheusEventSink {
    fn report(&self, event: &TelemetryEvent) {
        trace!(event = event.name(), "Telemetry event");
        match event {
            TelemetryEvent::LocationResolved {
                source,
                duration_ms,
                changed,
            } => {
                self.metrics.record_resolution(
                    &source.to_string(),
                    *changed,
                    *duration_ms as f64 / 1000.0,
                );
            }
            TelemetryEvent::StrategyFailed { strategy, kind } => {
                self.metrics
                    .record_strategy_error(strategy.as_str(), kind.as_str());
            }
            TelemetryEvent::ResolutionFailed {
                consecutive_failures,
            } => {
                self.metrics.record_total_failure(*consecutive_failures);
            }
            TelemetryEvent::CacheCleared => self.metrics.record_cache_cleared(),
        }
    }
}
