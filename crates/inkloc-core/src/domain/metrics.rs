//! Cumulative resolution metrics
//!
//! [`Metrics`] holds monotonically increasing counters that are persisted
//! alongside the location cache and survive restarts. [`MetricsSummary`]
//! adds the derived success rates reported by diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::StrategyErrorKind;

/// Detection strategies that keep success/failure counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Gps,
    Ip,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Gps => "gps",
            Strategy::Ip => "ip",
        }
    }
}

/// Cumulative counters; reset only by an explicit clear
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub gps_success: u64,
    pub gps_failure: u64,
    pub ip_success: u64,
    pub ip_failure: u64,
    pub cache_hits: u64,
    pub total_requests: u64,
    pub gps_errors: BTreeMap<StrategyErrorKind, u64>,
    pub ip_errors: BTreeMap<StrategyErrorKind, u64>,
}

impl Metrics {
    /// Records a successful strategy call
    pub fn record_success(&mut self, strategy: Strategy) {
        match strategy {
            Strategy::Gps => self.gps_success += 1,
            Strategy::Ip => self.ip_success += 1,
        }
    }

    /// Records a failed strategy call and bumps its error histogram
    pub fn record_failure(&mut self, strategy: Strategy, kind: StrategyErrorKind) {
        let histogram = match strategy {
            Strategy::Gps => {
                self.gps_failure += 1;
                &mut self.gps_errors
            }
            Strategy::Ip => {
                self.ip_failure += 1;
                &mut self.ip_errors
            }
        };
        *histogram.entry(kind).or_insert(0) += 1;
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_request(&mut self) {
        self.total_requests += 1;
    }

    /// Computes the derived summary
    ///
    /// The overall rate counts GPS and IP outcomes; cache hits are reported
    /// separately and are neither a success nor a failure of a lookup.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            success_rate: format_rate(
                self.gps_success + self.ip_success,
                self.gps_failure + self.ip_failure,
            ),
            gps_success_rate: format_rate(self.gps_success, self.gps_failure),
            ip_success_rate: format_rate(self.ip_success, self.ip_failure),
            counters: self.clone(),
        }
    }
}

/// Metrics plus derived percentage strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub success_rate: String,
    pub gps_success_rate: String,
    pub ip_success_rate: String,
    #[serde(flatten)]
    pub counters: Metrics,
}

/// Formats `successes / (successes + failures)` as a percentage string
///
/// Returns `"0%"` when there were no attempts; otherwise one decimal
/// place, e.g. `"66.7%"`.
pub fn format_rate(successes: u64, failures: u64) -> String {
    let total = successes + failures;
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", successes as f64 * 100.0 / total as f64)
}
