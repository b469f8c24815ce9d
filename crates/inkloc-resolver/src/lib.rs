//! InkLoc Resolver - adaptive client-location resolution
//!
//! Provides:
//! - An ordered fallback chain: on-device positioning, network-address
//!   lookup, then the last-known cache
//! - Change detection on city/region with observer notification
//! - Consent gating of on-device positioning
//! - Persistence of the cache record, cumulative metrics and preferences
//! - An adaptive scheduler driven by timers and lifecycle events
//!
//! ## Modules
//!
//! - [`service`] - [`LocationService`], the long-lived resolver
//! - [`scheduler`] - [`LocationScheduler`] and its control handle
//! - [`interval`] - Adaptive interval computation
//! - [`consent`] - Consent gate and the key-value consent store adapter
//! - [`store`] - Typed access to persisted records
//! - [`observers`] - Observer registry with failure isolation
//! - [`diagnostics`] - Operator-facing snapshot

pub mod consent;
pub mod diagnostics;
pub mod interval;
pub mod observers;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

use inkloc_core::domain::StrategyError;
use thiserror::Error;

pub use consent::{ConsentGate, KeyValueConsentStore};
pub use diagnostics::Diagnostics;
pub use observers::{ObserverRegistry, Subscription};
pub use scheduler::{LifecycleEvent, LocationScheduler, SchedulerHandle};
pub use service::{LocationService, ServiceDependencies};
pub use store::LocationStore;

/// Errors returned by resolution requests
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Every strategy failed and nothing is cached
    #[error("No location available")]
    NoLocationAvailable,

    /// Another resolution is in flight; this request was dropped
    #[error("A resolution is already in progress")]
    InProgress,

    /// On-device positioning was requested without a valid consent record
    #[error("Location consent has not been granted")]
    ConsentRequired,

    /// The device has no positioning capability
    #[error("On-device positioning is unavailable")]
    PositioningUnavailable,

    /// An explicit positioning request failed
    #[error("Positioning failed: {0}")]
    Positioning(StrategyError),

    /// The request was cancelled by its caller
    #[error("Resolution cancelled")]
    Cancelled,
}

impl From<StrategyError> for ResolveError {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::Cancelled => ResolveError::Cancelled,
            other => ResolveError::Positioning(other),
        }
    }
}

impl ResolveError {
    /// Stable code recorded as `lastError.type`
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::NoLocationAvailable => "no_location_available",
            ResolveError::InProgress => "in_progress",
            ResolveError::ConsentRequired => "consent_required",
            ResolveError::PositioningUnavailable => "positioning_unavailable",
            ResolveError::Positioning(_) => "positioning_failed",
            ResolveError::Cancelled => "cancelled",
        }
    }
}

/// Result alias for resolver operations
pub type Result<T> = std::result::Result<T, ResolveError>;
