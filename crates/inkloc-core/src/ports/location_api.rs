//! External location endpoints port
//!
//! Both endpoints are opaque services owned by the site backend. Any
//! transport failure, non-success status or undecodable body is reported as
//! a [`StrategyError`] so it can be tallied per kind.

use serde::{Deserialize, Serialize};

use crate::domain::{LocationResult, StrategyError};

/// Body of the reverse-lookup request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreciseLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
}

/// Port trait for the location lookup endpoints
#[async_trait::async_trait]
pub trait ILocationApi: Send + Sync {
    /// Reverse-looks-up coordinates to a place
    ///
    /// The returned result carries no source or coordinates; the resolver
    /// fills those in.
    async fn reverse_geocode(
        &self,
        request: &PreciseLocationRequest,
    ) -> Result<LocationResult, StrategyError>;

    /// Looks up the caller's place by network address
    async fn lookup_ip(&self) -> Result<LocationResult, StrategyError>;
}
