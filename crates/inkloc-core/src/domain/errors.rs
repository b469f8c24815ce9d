//! Domain error types
//!
//! This module defines validation errors for domain values and the closed
//! set of detection-strategy failures. Strategy failures are tallied per
//! [`StrategyErrorKind`], so histogram keys are always a known set.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Coordinates outside the valid latitude/longitude ranges
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Unknown location source name
    #[error("Invalid location source: {0}")]
    InvalidSource(String),

    /// Unknown preference key
    #[error("Unknown preference: {0}")]
    UnknownPreference(String),

    /// Preference value could not be parsed for its key
    #[error("Invalid value '{value}' for preference {key}")]
    InvalidPreferenceValue {
        /// The preference key
        key: String,
        /// The rejected value
        value: String,
    },
}

// ============================================================================
// Strategy failures
// ============================================================================

/// Why a single detection strategy failed
///
/// Strategy failures never reach callers of `resolve()` directly; they are
/// recorded into metrics and cause the resolver to fall through.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// The user or platform denied access to positioning
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The call did not complete within its timeout
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// The device could not determine a position
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    /// Transport-level failure (connection refused, DNS, reset, ...)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The endpoint answered with a non-success status
    #[error("Server error: HTTP {0}")]
    ServerError(u16),

    /// The endpoint answered 2xx with a body that could not be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The attempt was cancelled cooperatively
    #[error("Cancelled")]
    Cancelled,
}

impl StrategyError {
    /// Returns the payload-free kind used as a histogram key
    pub fn kind(&self) -> StrategyErrorKind {
        match self {
            StrategyError::PermissionDenied(_) => StrategyErrorKind::PermissionDenied,
            StrategyError::Timeout(_) => StrategyErrorKind::Timeout,
            StrategyError::PositionUnavailable(_) => StrategyErrorKind::PositionUnavailable,
            StrategyError::NetworkError(_) => StrategyErrorKind::NetworkError,
            StrategyError::ServerError(_) => StrategyErrorKind::ServerError,
            StrategyError::InvalidResponse(_) => StrategyErrorKind::InvalidResponse,
            StrategyError::Cancelled => StrategyErrorKind::Cancelled,
        }
    }
}

/// Closed set of strategy failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyErrorKind {
    PermissionDenied,
    Timeout,
    PositionUnavailable,
    NetworkError,
    ServerError,
    InvalidResponse,
    Cancelled,
}

impl StrategyErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [StrategyErrorKind; 7] = [
        StrategyErrorKind::PermissionDenied,
        StrategyErrorKind::Timeout,
        StrategyErrorKind::PositionUnavailable,
        StrategyErrorKind::NetworkError,
        StrategyErrorKind::ServerError,
        StrategyErrorKind::InvalidResponse,
        StrategyErrorKind::Cancelled,
    ];

    /// Stable snake_case label (matches the serialized form)
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyErrorKind::PermissionDenied => "permission_denied",
            StrategyErrorKind::Timeout => "timeout",
            StrategyErrorKind::PositionUnavailable => "position_unavailable",
            StrategyErrorKind::NetworkError => "network_error",
            StrategyErrorKind::ServerError => "server_error",
            StrategyErrorKind::InvalidResponse => "invalid_response",
            StrategyErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StrategyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
