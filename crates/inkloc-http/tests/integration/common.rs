//! Shared test helpers for location endpoint integration tests

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inkloc_http::client::LocationApiClient;

/// Client timeout used by the tests
pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

/// Starts a mock server and returns a client pointing at it
pub async fn setup_location_mock() -> (MockServer, LocationApiClient) {
    let server = MockServer::start().await;
    let client =
        LocationApiClient::with_base_url(server.uri(), TEST_TIMEOUT).expect("build client");
    (server, client)
}

/// Mounts `GET /api/location` answering with `body`
pub async fn mount_ip_lookup(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/location"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts `POST /api/location/precise` answering with `body`
pub async fn mount_precise(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/location/precise"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}
