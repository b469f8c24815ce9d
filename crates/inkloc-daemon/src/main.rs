//! InkLoc Daemon - Background location resolution service
//!
//! This binary runs as a user service and handles:
//! - Periodic, battery-aware location resolution
//! - Persistence of the last-known location, metrics and preferences
//! - An optional Prometheus `/metrics` endpoint
//! - `SIGHUP` as a forced refresh
//! - Connectivity changes polled from `/sys/class/net`
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! `main` is the composition root: it wires the SQLite store, the HTTP
//! client, detected device capabilities and the telemetry sink into a
//! `LocationService`, then hands the service to a `LocationScheduler`.
//! Every task is controlled by one `CancellationToken`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use inkloc_cache::{DatabasePool, SqliteKeyValueStore};
use inkloc_core::config::{Config, LoggingConfig};
use inkloc_core::domain::LocationUpdate;
use inkloc_core::ports::{IEventSink, IKeyValueStore, NoopEventSink};
use inkloc_device::{detect_device_profile, SysfsConnectivity};
use inkloc_http::client::LocationApiClient;
use inkloc_resolver::{
    KeyValueConsentStore, LocationScheduler, LocationService, ResolveError, SchedulerHandle,
    ServiceDependencies,
};
use inkloc_telemetry::{MetricsRegistry, MetricsServer, PrometheusEventSink};
use tokio_util::sync::CancellationToken;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const CONNECTIVITY_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "inklocd", version, about = "InkLoc location daemon")]
struct Args {
    /// Configuration file (defaults to the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the wired-up service and the handles needed to stop it
struct DaemonService {
    config: Config,
    db_pool: DatabasePool,
    service: LocationService,
    metrics: Option<Arc<MetricsRegistry>>,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens storage, detects capabilities and restores persisted state
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::new(&config.storage.database)
            .await
            .context("Failed to open database")?;
        let storage: Arc<dyn IKeyValueStore> =
            Arc::new(SqliteKeyValueStore::new(db_pool.pool().clone()));
        let consent = Arc::new(KeyValueConsentStore::new(
            Arc::clone(&storage),
            config.storage.keys.consent.clone(),
        ));

        let api = Arc::new(
            LocationApiClient::new(&config.api).context("Failed to create API client")?,
        );
        let device = detect_device_profile(&config.device);

        let metrics = if config.telemetry.metrics_enabled {
            Some(Arc::new(
                MetricsRegistry::new().context("Failed to create metrics registry")?,
            ))
        } else {
            None
        };
        let events = event_sink(metrics.as_ref());

        let service = LocationService::load(ServiceDependencies {
            config: config.clone(),
            device,
            api,
            storage,
            consent,
            events,
        })
        .await;

        Ok(Self {
            config,
            db_pool,
            service,
            metrics,
            shutdown,
        })
    }

    /// Runs the scheduler until shutdown, serving `SIGHUP` refreshes
    async fn run(&self) -> Result<()> {
        let metrics_task = self.metrics.as_ref().map(|metrics| {
            let endpoint = self.config.telemetry.metrics_endpoint.clone();
            let metrics = Arc::clone(metrics);
            let token = self.shutdown.child_token();
            tokio::spawn(async move {
                match MetricsServer::new(metrics, &endpoint) {
                    Ok(server) => {
                        if let Err(e) = server.run(token).await {
                            error!(error = %e, "Metrics server stopped");
                        }
                    }
                    Err(e) => error!(endpoint = %endpoint, error = %e, "Invalid metrics endpoint"),
                }
            })
        });

        let _subscription = self.service.add_listener(log_update);

        let (scheduler, handle) = LocationScheduler::new(self.service.clone());
        let scheduler_task = tokio::spawn(scheduler.run(self.shutdown.child_token()));
        info!("Scheduler started");

        // Headless: there is no visibility signal, only connectivity
        let connectivity_task = tokio::spawn(watch_connectivity(
            SysfsConnectivity::default(),
            handle,
            CONNECTIVITY_POLL_INTERVAL,
            self.shutdown.child_token(),
        ));

        self.refresh_on_hangup().await;

        self.service.shutdown();
        if let Err(e) = scheduler_task.await {
            error!(error = %e, "Scheduler task panicked");
        }
        if let Err(e) = connectivity_task.await {
            error!(error = %e, "Connectivity watch panicked");
        }
        if let Some(task) = metrics_task {
            let _ = task.await;
        }
        self.db_pool.close().await;
        Ok(())
    }

    #[cfg(unix)]
    async fn refresh_on_hangup(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Failed to install SIGHUP handler");
                self.shutdown.cancelled().await;
                return;
            }
        };

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = hangup.recv() => {
                    info!("Received SIGHUP, refreshing location");
                    match self.service.refresh().await {
                        Ok(location) => info!(location = %location.display_name(), "Refresh complete"),
                        Err(ResolveError::InProgress) => info!("Resolution already in progress"),
                        Err(e) => warn!(error = %e, "Refresh failed"),
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    async fn refresh_on_hangup(&self) {
        self.shutdown.cancelled().await;
    }
}

/// Polls interface state and forwards it to the scheduler
///
/// Unknown state (unreadable sysfs) leaves the service untouched.
async fn watch_connectivity(
    probe: SysfsConnectivity,
    handle: SchedulerHandle,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(online) = probe.is_online().await else {
                    continue;
                };
                if !handle.connectivity_changed(online).await {
                    debug!("Scheduler stopped, ending connectivity watch");
                    break;
                }
            }
        }
    }
}

fn event_sink(metrics: Option<&Arc<MetricsRegistry>>) -> Arc<dyn IEventSink> {
    match metrics {
        Some(metrics) => Arc::new(PrometheusEventSink::new(Arc::clone(metrics))),
        None => Arc::new(NoopEventSink),
    }
}

fn log_update(update: &LocationUpdate) {
    match update {
        LocationUpdate::Resolved(location) => info!(
            location = %location.display_name(),
            source = %location.source,
            "Location updated"
        ),
        LocationUpdate::Degraded {
            last_known,
            error_message,
            error_count,
        } => warn!(
            last_known = last_known.as_ref().map(|l| l.display_name()).unwrap_or_default(),
            error = %error_message,
            error_count,
            "Location unavailable"
        ),
    }
}

// ============================================================================
// Startup helpers
// ============================================================================

/// Loads the configuration; a missing file means defaults
fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    } else {
        Config::default()
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let report: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration:\n  {}", report.join("\n  "));
    }
    Ok(config)
}

/// `RUST_LOG` wins over the configured level
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging))
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = load_config(&config_path)?;

    init_tracing(&config.logging);
    info!(config_path = %config_path.display(), "InkLoc daemon starting (inklocd)");

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let daemon = DaemonService::new(config, shutdown_token).await?;
    let result = daemon.run().await;

    match &result {
        Ok(()) => info!("InkLoc daemon shut down gracefully"),
        Err(e) => error!(error = %e, "InkLoc daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.schedule.desktop_interval_secs, 600);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "schedule:\n  desktop_interval_secs: 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("schedule.desktop_interval_secs"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api: [not, a, map]\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_event_sink_follows_metrics_switch() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let sink = event_sink(Some(&metrics));
        sink.report(&inkloc_core::ports::TelemetryEvent::CacheCleared);
        assert!(metrics.encode().unwrap().contains("inkloc_cache_cleared_total 1"));

        event_sink(None).report(&inkloc_core::ports::TelemetryEvent::CacheCleared);
    }

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.storage.database = dir.join("inkloc.db");
        config.api.base_url = "http://127.0.0.1:9".to_string();
        config.api.request_timeout_secs = 1;
        config
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn test_daemon_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let shutdown = CancellationToken::new();
        let daemon = DaemonService::new(config, shutdown.clone()).await.unwrap();
        shutdown.cancel();
        daemon.run().await.unwrap();
        assert!(dir.path().join("inkloc.db").exists());
    }

    #[tokio::test]
    async fn test_connectivity_watch_drives_offline_state() {
        let dir = tempfile::tempdir().unwrap();
        let net = dir.path().join("net");
        std::fs::create_dir_all(net.join("eth0")).unwrap();
        std::fs::write(net.join("eth0").join("operstate"), "down\n").unwrap();

        let shutdown = CancellationToken::new();
        let daemon = DaemonService::new(test_config(dir.path()), shutdown.clone())
            .await
            .unwrap();
        let (_scheduler, handle) = LocationScheduler::new(daemon.service.clone());
        let watch = tokio::spawn(watch_connectivity(
            SysfsConnectivity::new(net.clone()),
            handle,
            Duration::from_millis(10),
            shutdown.child_token(),
        ));

        wait_until(|| daemon.service.is_network_offline()).await;

        std::fs::write(net.join("eth0").join("operstate"), "up\n").unwrap();
        wait_until(|| !daemon.service.is_network_offline()).await;

        shutdown.cancel();
        watch.await.unwrap();
    }
}
