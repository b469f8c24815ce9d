//! Integration tests for inkloc-http
//!
//! Uses wiremock to simulate the site's location endpoints and verifies
//! request shapes, response parsing and error classification.

mod common;

mod test_ip_lookup;
mod test_reverse_geocode;
