//! Adaptive scheduling interval
//!
//! The base interval depends on the device class and the user's frequency
//! preference. An adaptive multiplier is then applied; the first matching
//! rule wins:
//!
//! | Condition                                 | Multiplier |
//! |-------------------------------------------|------------|
//! | more than 3 consecutive failures          | x2         |
//! | mobile and battery below 20%              | x3         |
//! | battery below 50%                         | x1.5       |
//! | otherwise                                 | x1         |
//!
//! Battery rules apply only when a level is known and battery optimization
//! is enabled.

use std::time::Duration;

use inkloc_core::domain::UpdateFrequency;

/// Failure streak above which the interval doubles
pub const FAILURE_BACKOFF_THRESHOLD: u32 = 3;
/// Mobile battery level below which the interval triples
pub const CRITICAL_BATTERY_LEVEL: f64 = 0.2;
/// Battery level below which the interval grows by half
pub const LOW_BATTERY_LEVEL: f64 = 0.5;

/// Everything the interval depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalInputs {
    /// Device-class base interval before the frequency adjustment
    pub base: Duration,
    pub is_mobile: bool,
    pub frequency: UpdateFrequency,
    pub consecutive_failures: u32,
    /// Charge fraction, `None` when no battery capability is present
    pub battery_level: Option<f64>,
    pub battery_optimization: bool,
}

/// Base interval after the frequency adjustment, `None` when disabled
pub fn base_interval(base: Duration, frequency: UpdateFrequency) -> Option<Duration> {
    match frequency {
        UpdateFrequency::Normal => Some(base),
        UpdateFrequency::Reduced => Some(base * 2),
        UpdateFrequency::Disabled => None,
    }
}

/// The adaptive multiplier for the given conditions
pub fn multiplier(inputs: &IntervalInputs) -> f64 {
    if inputs.consecutive_failures > FAILURE_BACKOFF_THRESHOLD {
        return 2.0;
    }
    let level = if inputs.battery_optimization {
        inputs.battery_level
    } else {
        None
    };
    match level {
        Some(level) if inputs.is_mobile && level < CRITICAL_BATTERY_LEVEL => 3.0,
        Some(level) if level < LOW_BATTERY_LEVEL => 1.5,
        _ => 1.0,
    }
}

/// Computes the next timer interval, `None` when no timer should be armed
pub fn next_interval(inputs: &IntervalInputs) -> Option<Duration> {
    let base = base_interval(inputs.base, inputs.frequency)?;
    Some(base.mul_f64(multiplier(inputs)))
}
