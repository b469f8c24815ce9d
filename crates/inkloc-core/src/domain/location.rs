//! Location results and the persisted last-known-location record
//!
//! A [`LocationResult`] is the unit of truth produced by every detection
//! strategy. Its JSON shape (camelCase fields, lowercase `source`) is shared
//! with the external lookup endpoints and the local cache.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// LocationSource
// ============================================================================

/// Which detection strategy produced a [`LocationResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// On-device positioning followed by a reverse lookup
    Gps,
    /// Network-address based lookup
    Ip,
    /// Last-known location served from the local cache
    Cache,
}

impl Default for LocationSource {
    fn default() -> Self {
        LocationSource::Ip
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationSource::Gps => "gps",
            LocationSource::Ip => "ip",
            LocationSource::Cache => "cache",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for LocationSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gps" => Ok(LocationSource::Gps),
            "ip" => Ok(LocationSource::Ip),
            "cache" => Ok(LocationSource::Cache),
            other => Err(DomainError::InvalidSource(other.to_string())),
        }
    }
}

// ============================================================================
// Coordinates
// ============================================================================

/// Decimal-degree coordinates reported by on-device positioning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Creates coordinates, rejecting values outside the WGS84 ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&latitude) || !latitude.is_finite() {
            return Err(DomainError::InvalidCoordinates(format!(
                "latitude {latitude} out of range"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) || !longitude.is_finite() {
            return Err(DomainError::InvalidCoordinates(format!(
                "longitude {longitude} out of range"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

// ============================================================================
// LocationResult
// ============================================================================

/// An approximate place produced by one detection strategy
///
/// `coordinates` and `accuracy` are only present for on-device positioning.
/// `response_time` is the latency of the strategy call in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResult {
    pub city: String,
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub source: LocationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
}

impl LocationResult {
    /// Creates a result with only the place identifiers set
    pub fn new(
        city: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
        source: LocationSource,
    ) -> Self {
        Self {
            city: city.into(),
            region: region.into(),
            country: country.into(),
            source,
            coordinates: None,
            accuracy: None,
            response_time: None,
        }
    }

    /// Attaches device coordinates and a human-readable accuracy in meters
    pub fn with_position(mut self, coordinates: Coordinates, accuracy_m: f64) -> Self {
        self.coordinates = Some(coordinates);
        self.accuracy = Some(format_accuracy(accuracy_m));
        self
    }

    /// Sets the strategy latency
    pub fn with_response_time(mut self, millis: u64) -> Self {
        self.response_time = Some(millis);
        self
    }

    /// Overrides the source (e.g. when re-serving a cached record)
    pub fn with_source(mut self, source: LocationSource) -> Self {
        self.source = source;
        self
    }

    /// Returns true if `other` names a different place than `self`
    ///
    /// Only `city` and `region` are compared. Coordinate or accuracy
    /// deltas alone never count as a change.
    pub fn is_material_change(&self, other: &LocationResult) -> bool {
        self.city != other.city || self.region != other.region
    }

    /// Short display name, e.g. `"Laurel, MD"`
    pub fn display_name(&self) -> String {
        match (self.city.is_empty(), self.region.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.region),
            (false, true) => self.city.clone(),
            (true, false) => self.region.clone(),
            (true, true) => self.country.clone(),
        }
    }
}

/// Formats an accuracy radius as whole meters, e.g. `"50m"`
pub fn format_accuracy(accuracy_m: f64) -> String {
    format!("{}m", accuracy_m.max(0.0).round() as u64)
}

// ============================================================================
// CacheRecord
// ============================================================================

/// Persisted last-known location
///
/// Stored as JSON `{ "location": ..., "timestamp": <epoch millis> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub location: LocationResult,
    /// Epoch milliseconds at which the record was written
    pub timestamp: i64,
}

impl CacheRecord {
    /// Creates a record stamped with `at`
    pub fn new(location: LocationResult, at: DateTime<Utc>) -> Self {
        Self {
            location,
            timestamp: at.timestamp_millis(),
        }
    }

    /// Returns the write time, or `None` for an unrepresentable timestamp
    pub fn written_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Returns true if the record is no older than `ttl` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() - self.timestamp <= ttl.num_milliseconds()
    }
}
