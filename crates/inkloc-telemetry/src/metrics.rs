//! Prometheus metrics registry for InkLoc
//!
//! Mirrors the resolver's telemetry events as labeled series.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Central metrics registry holding all Prometheus metrics.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: resolved locations by (source, changed)
    pub resolutions_total: IntCounterVec,
    /// Counter: strategy failures by (strategy, kind)
    pub strategy_errors_total: IntCounterVec,
    /// Counter: attempts where every strategy failed
    pub resolution_failures_total: IntCounter,
    /// Gauge: current run of consecutive total failures
    pub consecutive_failures: IntGauge,
    /// Counter: operator cache clears
    pub cache_cleared_total: IntCounter,
    /// Histogram: resolution latency in seconds
    pub resolution_duration_seconds: Histogram,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("inkloc".to_string()), None)?;

        let resolutions_total = IntCounterVec::new(
            Opts::new("resolutions_total", "Resolved locations by source"),
            &["source", "changed"],
        )?;
        registry.register(Box::new(resolutions_total.clone()))?;

        let strategy_errors_total = IntCounterVec::new(
            Opts::new("strategy_errors_total", "Strategy failures by kind"),
            &["strategy", "kind"],
        )?;
        registry.register(Box::new(strategy_errors_total.clone()))?;

        let resolution_failures_total = IntCounter::new(
            "resolution_failures_total",
            "Attempts where every strategy failed",
        )?;
        registry.register(Box::new(resolution_failures_total.clone()))?;

        let consecutive_failures = IntGauge::new(
            "consecutive_failures",
            "Current run of consecutive total failures",
        )?;
        registry.register(Box::new(consecutive_failures.clone()))?;

        let cache_cleared_total =
            IntCounter::new("cache_cleared_total", "Operator cache clears")?;
        registry.register(Box::new(cache_cleared_total.clone()))?;

        let resolution_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "resolution_duration_seconds",
                "Location resolution latency in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 8.0, 12.0, f64::INFINITY]),
        )?;
        registry.register(Box::new(resolution_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            resolutions_total,
            strategy_errors_total,
            resolution_failures_total,
            consecutive_failures,
            cache_cleared_total,
            resolution_duration_seconds,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record a resolved location and its latency.
    pub fn record_resolution(&self, source: &str, changed: bool, duration_secs: f64) {
        let changed = if changed { "true" } else { "false" };
        self.resolutions_total
            .with_label_values(&[source, changed])
            .inc();
        self.resolution_duration_seconds.observe(duration_secs);
        self.consecutive_failures.set(0);
    }

    /// Record a single strategy failure.
    pub fn record_strategy_error(&self, strategy: &str, kind: &str) {
        self.strategy_errors_total
            .with_label_values(&[strategy, kind])
            .inc();
    }

    /// Record an attempt where every strategy failed.
    pub fn record_total_failure(&self, consecutive_failures: u32) {
        self.resolution_failures_total.inc();
        self.consecutive_failures.set(i64::from(consecutive_failures));
    }

    pub fn record_cache_cleared(&self) {
        self.cache_cleared_total.inc();
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_creation() {
        let registry = MetricsRegistry::new().expect("create registry");
        let output = registry.encode().expect("encode");
        assert!(output.contains("inkloc_consecutive_failures 0"));
    }

    #[test]
    fn test_record_resolution() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_resolution("gps", true, 1.2);
        registry.record_resolution("ip", false, 0.3);

        let output = registry.encode().unwrap();
        assert!(output.contains("inkloc_resolutions_total{changed=\"true\",source=\"gps\"} 1"));
        assert!(output.contains("inkloc_resolution_duration_seconds_count 2"));
    }

    #[test]
    fn test_failures_set_gauge_and_success_resets_it() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_total_failure(1);
        registry.record_total_failure(2);
        assert!(registry.encode().unwrap().contains("inkloc_consecutive_failures 2"));

        registry.record_resolution("cache", false, 0.01);
        let output = registry.encode().unwrap();
        assert!(output.contains("inkloc_consecutive_failures 0"));
        assert!(output.contains("inkloc_resolution_failures_total 2"));
    }

    #[test]
    fn test_record_strategy_error() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_strategy_error("gps", "permission_denied");

        let output = registry.encode().unwrap();
        assert!(output
            .contains("inkloc_strategy_errors_total{kind=\"permission_denied\",strategy=\"gps\"} 1"));
    }
}
