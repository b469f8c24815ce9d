//! Operator-facing diagnostics snapshot
//!
//! The current location is reduced to its display name and source.
//! Coordinates and accuracy are never exported.

use chrono::{DateTime, Utc};
use serde::Serialize;

use inkloc_core::domain::{ErrorState, LocationSource, MetricsSummary, UserPreferences};

/// Full diagnostics export
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub exported_at: DateTime<Utc>,
    pub device: DeviceCapabilities,
    pub preferences: UserPreferences,
    pub metrics: MetricsSummary,
    pub current_location: Option<LocationSnapshot>,
    pub error_state: ErrorState,
}

/// Capability flags detected at startup
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub is_mobile: bool,
    pub positioning: bool,
    pub battery: bool,
    pub battery_level: Option<f64>,
    pub consent_granted: bool,
}

/// Privacy-reduced view of the current location
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSnapshot {
    pub name: String,
    pub source: LocationSource,
    pub last_updated: Option<DateTime<Utc>>,
}
