//! Location endpoints client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use inkloc_http::client::LocationApiClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = LocationApiClient::with_base_url("https://studio.example.com", Duration::from_secs(10))?;
//! let place = client.ip_location().await?;
//! println!("Hello from {}", place.display_name());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Response};
use tracing::debug;

use inkloc_core::config::ApiConfig;
use inkloc_core::domain::{LocationResult, StrategyError};
use inkloc_core::ports::{ILocationApi, PreciseLocationRequest};

use crate::ApiError;

const PRECISE_PATH: &str = "/api/location/precise";
const IP_PATH: &str = "/api/location";

/// Longest error body kept in [`ApiError::Status`]
const MAX_ERROR_BODY: usize = 256;

/// HTTP client for the site's location endpoints
#[derive(Debug, Clone)]
pub struct LocationApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl LocationApiClient {
    /// Creates a client from the `api` configuration section
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        Self::with_base_url(config.base_url.clone(), config.request_timeout())
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("inkloc/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reverse-looks-up device coordinates
    pub async fn precise_location(
        &self,
        request: &PreciseLocationRequest,
    ) -> Result<LocationResult, ApiError> {
        let url = format!("{}{}", self.base_url, PRECISE_PATH);
        debug!(url = %url, accuracy = request.accuracy, "POST precise location");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.parse_place(response).await
    }

    /// Looks up the caller's place by network address
    pub async fn ip_location(&self) -> Result<LocationResult, ApiError> {
        let url = format!("{}{}", self.base_url, IP_PATH);
        debug!(url = %url, "GET ip location");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.parse_place(response).await
    }

    async fn parse_place(&self, response: Response) -> Result<LocationResult, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let place: LocationResult = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        if place.city.trim().is_empty() && place.region.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "response names no city or region".to_string(),
            ));
        }
        debug!(city = %place.city, region = %place.region, "Location endpoint answered");
        Ok(place)
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else {
            ApiError::NetworkError(err)
        }
    }
}

#[async_trait::async_trait]
impl ILocationApi for LocationApiClient {
    async fn reverse_geocode(
        &self,
        request: &PreciseLocationRequest,
    ) -> Result<LocationResult, StrategyError> {
        Ok(self.precise_location(request).await?)
    }

    async fn lookup_ip(&self) -> Result<LocationResult, StrategyError> {
        Ok(self.ip_location().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client =
            LocationApiClient::with_base_url("http://localhost:3000/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_new_uses_config_values() {
        let config = ApiConfig {
            base_url: "https://studio.example.com".to_string(),
            request_timeout_secs: 4,
        };
        let client = LocationApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://studio.example.com");
        assert_eq!(client.timeout, Duration::from_secs(4));
    }
}
