//! InkLoc Telemetry - Prometheus observability
//!
//! Provides:
//! - `MetricsRegistry`: Prometheus counters, gauge and histogram for
//!   location resolution
//! - `PrometheusEventSink`: the `IEventSink` adapter feeding the registry
//! - `MetricsServer`: HTTP server for Prometheus scraping

pub mod metrics;
pub mod server;
pub mod sink;

pub use metrics::MetricsRegistry;
pub use server::MetricsServer;
pub use sink::PrometheusEventSink;
