//! InkLoc HTTP - client for the location lookup endpoints
//!
//! Provides:
//! - `POST /api/location/precise` - reverse lookup of device coordinates
//! - `GET /api/location` - network-address based lookup
//!
//! ## Modules
//!
//! - [`client`] - [`LocationApiClient`](client::LocationApiClient), the
//!   `ILocationApi` adapter

pub mod client;

use std::time::Duration;

use inkloc_core::domain::StrategyError;
use thiserror::Error;

/// Errors that can occur when calling the location endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not complete within the client timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The response body could not be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<ApiError> for StrategyError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Timeout(after) => StrategyError::Timeout(after.as_millis() as u64),
            ApiError::Status { status, .. } => StrategyError::ServerError(status),
            ApiError::InvalidResponse(msg) => StrategyError::InvalidResponse(msg),
            ApiError::NetworkError(e) => StrategyError::NetworkError(e.to_string()),
        }
    }
}
