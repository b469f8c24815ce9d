//! Integration tests for the network-address lookup endpoint

use std::time::Duration;

use inkloc_core::domain::{LocationSource, StrategyErrorKind};
use inkloc_core::ports::ILocationApi;
use inkloc_http::ApiError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_ip_lookup_parses_location() {
    let (server, client) = common::setup_location_mock().await;
    common::mount_ip_lookup(
        &server,
        200,
        serde_json::json!({
            "city": "Laurel",
            "region": "MD",
            "country": "US",
            "source": "ip"
        }),
    )
    .await;

    let place = client.ip_location().await.expect("ip lookup failed");
    assert_eq!(place.display_name(), "Laurel, MD");
    assert_eq!(place.country, "US");
    assert_eq!(place.source, LocationSource::Ip);
}

#[tokio::test]
async fn test_ip_lookup_defaults_source_to_ip() {
    let (server, client) = common::setup_location_mock().await;
    common::mount_ip_lookup(
        &server,
        200,
        serde_json::json!({ "city": "Laurel", "region": "MD" }),
    )
    .await;

    let place = client.lookup_ip().await.expect("ip lookup failed");
    assert_eq!(place.source, LocationSource::Ip);
    assert_eq!(place.country, "");
}

#[tokio::test]
async fn test_ip_lookup_server_error_is_strategy_failure() {
    let (server, client) = common::setup_location_mock().await;
    common::mount_ip_lookup(&server, 503, serde_json::json!({ "error": "unavailable" })).await;

    let err = client.ip_location().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));

    let err = client.lookup_ip().await.unwrap_err();
    assert_eq!(err.kind(), StrategyErrorKind::ServerError);
}

#[tokio::test]
async fn test_ip_lookup_rejects_unusable_body() {
    let (server, client) = common::setup_location_mock().await;
    common::mount_ip_lookup(&server, 200, serde_json::json!({ "city": "", "region": "" })).await;

    let err = client.lookup_ip().await.unwrap_err();
    assert_eq!(err.kind(), StrategyErrorKind::InvalidResponse);
}

#[tokio::test]
async fn test_ip_lookup_times_out() {
    let (server, client) = common::setup_location_mock().await;
    Mock::given(method("GET"))
        .and(path("/api/location"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "city": "Laurel", "region": "MD" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client.lookup_ip().await.unwrap_err();
    assert_eq!(err.kind(), StrategyErrorKind::Timeout);
}

#[tokio::test]
async fn test_ip_lookup_connection_refused_is_network_error() {
    let server = wiremock::MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = inkloc_http::client::LocationApiClient::with_base_url(uri, common::TEST_TIMEOUT)
        .expect("build client");
    let err = client.lookup_ip().await.unwrap_err();
    assert!(matches!(
        err.kind(),
        StrategyErrorKind::NetworkError | StrategyErrorKind::Timeout
    ));
}
