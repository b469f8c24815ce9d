//! Integration tests for the reverse-lookup endpoint

use inkloc_core::domain::StrategyErrorKind;
use inkloc_core::ports::{ILocationApi, PreciseLocationRequest};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn request() -> PreciseLocationRequest {
    PreciseLocationRequest {
        latitude: 39.0993,
        longitude: -76.8483,
        accuracy: 48.0,
    }
}

#[tokio::test]
async fn test_reverse_geocode_posts_coordinates() {
    let (server, client) = common::setup_location_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/location/precise"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "latitude": 39.0993,
            "longitude": -76.8483,
            "accuracy": 48.0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Laurel",
            "region": "MD",
            "country": "US"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let place = client
        .reverse_geocode(&request())
        .await
        .expect("reverse geocode failed");
    assert_eq!(place.display_name(), "Laurel, MD");
    assert!(place.coordinates.is_none());
}

#[tokio::test]
async fn test_reverse_geocode_non_success_status() {
    let (server, client) = common::setup_location_mock().await;
    common::mount_precise(&server, 429, serde_json::json!({ "error": "slow down" })).await;

    let err = client.reverse_geocode(&request()).await.unwrap_err();
    assert_eq!(err.kind(), StrategyErrorKind::ServerError);
}

#[tokio::test]
async fn test_reverse_geocode_malformed_body() {
    let (server, client) = common::setup_location_mock().await;
    Mock::given(method("POST"))
        .and(path("/api/location/precise"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.reverse_geocode(&request()).await.unwrap_err();
    assert_eq!(err.kind(), StrategyErrorKind::InvalidResponse);
}
