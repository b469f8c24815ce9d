//! Location service - the long-lived resolver
//!
//! [`LocationService`] owns the in-memory location state, the cumulative
//! metrics and the user preferences. It is constructed explicitly from a
//! [`ServiceDependencies`] bundle and shared by cloning (the state lives
//! behind an `Arc`).
//!
//! ## Fallback chain
//!
//! ```text
//! resolve() ──→ offline? ──yes──→ last-known cache ──→ NoLocationAvailable
//!                  │no
//!                  ▼
//!           positioning (gps enabled + capability + consent)
//!                  │failure
//!                  ▼
//!           network-address lookup
//!                  │failure
//!                  ▼
//!           last-known cache (age ignored) ──→ NoLocationAvailable
//! ```
//!
//! Strategy failures are tallied into [`Metrics`] and never surface to the
//! caller. Only one resolution runs at a time; a concurrent request returns
//! [`ResolveError::InProgress`] immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use inkloc_core::config::Config;
use inkloc_core::domain::{
    CacheRecord, Coordinates, ErrorState, LocationResult, LocationSource, LocationUpdate, Metrics,
    MetricsSummary, PreferenceChange, Strategy, StrategyError, UserPreferences,
};
use inkloc_core::ports::{
    DeviceProfile, IConsentStore, IEventSink, IKeyValueStore, ILocationApi, PositionOptions,
    PreciseLocationRequest, TelemetryEvent,
};

use crate::consent::ConsentGate;
use crate::diagnostics::{DeviceCapabilities, Diagnostics, LocationSnapshot};
use crate::interval::{self, IntervalInputs};
use crate::observers::{ObserverRegistry, Subscription};
use crate::store::LocationStore;
use crate::{ResolveError, Result};

/// Everything the service needs from the outside world
pub struct ServiceDependencies {
    pub config: Config,
    pub device: DeviceProfile,
    pub api: Arc<dyn ILocationApi>,
    pub storage: Arc<dyn IKeyValueStore>,
    pub consent: Arc<dyn IConsentStore>,
    pub events: Arc<dyn IEventSink>,
}

#[derive(Debug, Default)]
struct ServiceState {
    current: Option<LocationResult>,
    last_updated: Option<DateTime<Utc>>,
    /// Monotonic twin of `last_updated`, used for scheduling decisions
    last_updated_at: Option<Instant>,
    /// Last persisted record of any age; the last-resort source
    last_known: Option<CacheRecord>,
    metrics: Metrics,
    preferences: UserPreferences,
    error_state: ErrorState,
}

struct Inner {
    config: Config,
    device: DeviceProfile,
    api: Arc<dyn ILocationApi>,
    store: LocationStore,
    consent: ConsentGate,
    events: Arc<dyn IEventSink>,
    observers: ObserverRegistry,
    state: Mutex<ServiceState>,
    in_flight: AtomicBool,
    preferences_changed: Notify,
    shutdown: CancellationToken,
}

/// Adaptive client-location resolver
#[derive(Clone)]
pub struct LocationService {
    inner: Arc<Inner>,
}

/// Clears the in-flight flag when a resolution settles
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LocationService {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Builds the service and restores persisted state
    ///
    /// A cache record older than the configured TTL is not restored as the
    /// current location but is kept as the last-resort fallback. Metrics
    /// load regardless of age. Any persistence failure is logged and the
    /// affected record starts from its default.
    pub async fn load(deps: ServiceDependencies) -> Self {
        let store = LocationStore::new(deps.storage, deps.config.storage.keys.clone());
        let consent = ConsentGate::new(deps.consent, deps.config.consent.max_age());
        let mut state = ServiceState::default();

        match store.load_cache().await {
            Ok(Some(record)) => {
                let now = Utc::now();
                if record.is_fresh(now, deps.config.storage.cache_ttl()) {
                    info!(
                        city = %record.location.city,
                        region = %record.location.region,
                        "Restored cached location"
                    );
                    let age = (now.timestamp_millis() - record.timestamp).max(0) as u64;
                    state.current = Some(record.location.clone());
                    state.last_updated = record.written_at();
                    state.last_updated_at =
                        Instant::now().checked_sub(Duration::from_millis(age));
                } else {
                    info!(
                        timestamp = record.timestamp,
                        "Cached location is stale, not restoring it"
                    );
                }
                state.last_known = Some(record);
            }
            Ok(None) => debug!("No cached location"),
            Err(e) => warn!(error = %e, "Failed to load cached location"),
        }

        match store.load_metrics().await {
            Ok(Some(metrics)) => state.metrics = metrics,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load metrics, starting from zero"),
        }

        match store.load_preferences().await {
            Ok(Some(preferences)) => state.preferences = preferences,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to load preferences, using defaults"),
        }

        info!(
            mobile = deps.device.is_mobile,
            positioning = deps.device.positioning.is_available(),
            battery = deps.device.battery.is_available(),
            "Location service ready"
        );

        Self {
            inner: Arc::new(Inner {
                config: deps.config,
                device: deps.device,
                api: deps.api,
                store,
                consent,
                events: deps.events,
                observers: ObserverRegistry::new(),
                state: Mutex::new(state),
                in_flight: AtomicBool::new(false),
                preferences_changed: Notify::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Runs the fallback chain once
    ///
    /// Returns the resolved location, which may come from the cache. A
    /// materially different result replaces the current location, is
    /// persisted and is pushed to observers.
    pub async fn resolve(&self) -> Result<LocationResult> {
        let _guard = self.begin()?;
        let started = Instant::now();

        let location = self
            .run_chain()
            .await
            .ok_or(ResolveError::NoLocationAvailable)?;
        self.accept(&location, started.elapsed()).await;
        Ok(location)
    }

    /// Resolves and converts a total failure into error state
    ///
    /// This is what the scheduler runs. On `NoLocationAvailable` the failure
    /// streak grows and observers receive a degraded update carrying the
    /// last-known location.
    pub async fn refresh(&self) -> Result<LocationResult> {
        match self.resolve().await {
            Ok(location) => Ok(location),
            Err(ResolveError::InProgress) => {
                debug!("Resolution already in flight, dropping trigger");
                Err(ResolveError::InProgress)
            }
            Err(err) => {
                self.record_total_failure(&err);
                Err(err)
            }
        }
    }

    /// Explicit high-accuracy positioning, bypassing the schedule
    ///
    /// Requires a valid consent record and a positioning capability. The
    /// `gps_enabled` preference does not apply to explicit requests.
    /// Failures are tallied like scheduled GPS failures and returned.
    pub async fn request_high_accuracy(&self, cancel: CancellationToken) -> Result<LocationResult> {
        if !self.inner.device.positioning.is_available() {
            return Err(ResolveError::PositioningUnavailable);
        }
        if !self.inner.consent.has_consent().await {
            return Err(ResolveError::ConsentRequired);
        }
        let _guard = self.begin()?;
        let started = Instant::now();
        self.update_metrics(Metrics::record_request).await;

        match self.locate_with_positioning(true, &cancel).await {
            Ok(location) => {
                self.record_strategy_success(Strategy::Gps).await;
                self.accept(&location, started.elapsed()).await;
                Ok(location)
            }
            Err(err) => {
                self.record_strategy_failure(Strategy::Gps, &err).await;
                Err(err.into())
            }
        }
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        if self.inner.in_flight.swap(true, Ordering::AcqRel) {
            return Err(ResolveError::InProgress);
        }
        Ok(InFlight(&self.inner.in_flight))
    }

    async fn run_chain(&self) -> Option<LocationResult> {
        self.update_metrics(Metrics::record_request).await;

        let (offline, preferences) = {
            let state = self.state();
            (state.error_state.network_offline, state.preferences)
        };

        if offline {
            debug!("Network offline, serving last-known location");
            return self.serve_from_cache().await;
        }

        if preferences.gps_enabled
            && self.inner.device.positioning.is_available()
            && self.inner.consent.has_consent().await
        {
            let cancel = self.inner.shutdown.child_token();
            match self.locate_with_positioning(false, &cancel).await {
                Ok(location) => {
                    self.record_strategy_success(Strategy::Gps).await;
                    return Some(location);
                }
                Err(err) => self.record_strategy_failure(Strategy::Gps, &err).await,
            }
        } else {
            debug!(
                gps_enabled = preferences.gps_enabled,
                "Skipping on-device positioning"
            );
        }

        if self.is_network_offline() {
            debug!("Network went offline during positioning, serving last-known location");
            return self.serve_from_cache().await;
        }

        match self.lookup_ip().await {
            Ok(location) => {
                self.record_strategy_success(Strategy::Ip).await;
                return Some(location);
            }
            Err(err) => self.record_strategy_failure(Strategy::Ip, &err).await,
        }

        self.serve_from_cache().await
    }

    async fn locate_with_positioning(
        &self,
        high_accuracy: bool,
        cancel: &CancellationToken,
    ) -> std::result::Result<LocationResult, StrategyError> {
        let Some(provider) = self.inner.device.positioning.get().cloned() else {
            return Err(StrategyError::PositionUnavailable(
                "no positioning capability".to_string(),
            ));
        };
        let timeout = self
            .inner
            .config
            .positioning
            .timeout(self.inner.device.is_mobile);
        let options = PositionOptions {
            high_accuracy,
            timeout,
        };
        let started = Instant::now();
        debug!(
            high_accuracy,
            timeout_ms = timeout.as_millis() as u64,
            "Requesting device position"
        );

        let position = tokio::select! {
            _ = cancel.cancelled() => return Err(StrategyError::Cancelled),
            _ = self.inner.shutdown.cancelled() => return Err(StrategyError::Cancelled),
            result = tokio::time::timeout(timeout, provider.current_position(options, cancel.clone())) => {
                result.map_err(|_| StrategyError::Timeout(timeout.as_millis() as u64))??
            }
        };

        let coordinates = Coordinates::new(position.latitude, position.longitude)
            .map_err(|e| StrategyError::InvalidResponse(e.to_string()))?;
        let request = PreciseLocationRequest {
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: position.accuracy_m,
        };

        let place = tokio::select! {
            _ = cancel.cancelled() => return Err(StrategyError::Cancelled),
            result = self.inner.api.reverse_geocode(&request) => result?,
        };

        Ok(place
            .with_source(LocationSource::Gps)
            .with_position(coordinates, position.accuracy_m)
            .with_response_time(started.elapsed().as_millis() as u64))
    }

    async fn lookup_ip(&self) -> std::result::Result<LocationResult, StrategyError> {
        let started = Instant::now();
        let location = self.inner.api.lookup_ip().await?;
        Ok(location.with_response_time(started.elapsed().as_millis() as u64))
    }

    async fn serve_from_cache(&self) -> Option<LocationResult> {
        let cached = {
            let state = self.state();
            state
                .last_known
                .as_ref()
                .map(|record| record.location.clone())
                .or_else(|| state.current.clone())
        };
        let location = cached?;
        self.update_metrics(Metrics::record_cache_hit).await;
        debug!(city = %location.city, "Serving last-known location");
        Some(LocationResult {
            response_time: None,
            ..location.with_source(LocationSource::Cache)
        })
    }

    /// Applies change detection to a resolved location
    async fn accept(&self, location: &LocationResult, elapsed: Duration) {
        let now = Utc::now();
        let from_cache = location.source == LocationSource::Cache;

        let (changed, record) = {
            let mut state = self.state();
            state.error_state.record_success();
            let changed = state
                .current
                .as_ref()
                .map_or(true, |current| current.is_material_change(location));
            if changed {
                state.current = Some(location.clone());
            }
            let mut record = None;
            if !from_cache {
                state.last_updated = Some(now);
                state.last_updated_at = Some(Instant::now());
                if changed {
                    let r = CacheRecord::new(location.clone(), now);
                    state.last_known = Some(r.clone());
                    record = Some(r);
                }
            }
            (changed, record)
        };

        if let Some(record) = record {
            if let Err(e) = self.inner.store.save_cache(&record).await {
                warn!(error = %e, "Failed to persist location cache");
            }
        }

        self.inner.events.report(&TelemetryEvent::LocationResolved {
            source: location.source,
            duration_ms: elapsed.as_millis() as u64,
            changed,
        });

        if changed {
            info!(
                city = %location.city,
                region = %location.region,
                source = %location.source,
                "Location changed"
            );
            self.inner
                .observers
                .notify(&LocationUpdate::Resolved(location.clone()));
        } else {
            debug!(source = %location.source, "Location unchanged");
        }
    }

    fn record_total_failure(&self, err: &ResolveError) {
        let (count, last_known) = {
            let mut state = self.state();
            let count = state
                .error_state
                .record_failure(err.to_string(), err.code(), Utc::now());
            (count, state.current.clone())
        };
        warn!(consecutive_failures = count, error = %err, "Location resolution failed");
        self.inner.events.report(&TelemetryEvent::ResolutionFailed {
            consecutive_failures: count,
        });
        self.inner.observers.notify(&LocationUpdate::Degraded {
            last_known,
            error_message: err.to_string(),
            error_count: count,
        });
    }

    async fn record_strategy_success(&self, strategy: Strategy) {
        self.update_metrics(|m| m.record_success(strategy)).await;
    }

    async fn record_strategy_failure(&self, strategy: Strategy, err: &StrategyError) {
        let kind = err.kind();
        warn!(
            strategy = strategy.as_str(),
            kind = %kind,
            error = %err,
            "Strategy failed, falling through"
        );
        self.update_metrics(|m| m.record_failure(strategy, kind))
            .await;
        self.inner
            .events
            .report(&TelemetryEvent::StrategyFailed { strategy, kind });
    }

    /// Mutates the metrics and persists the new totals
    async fn update_metrics(&self, update: impl FnOnce(&mut Metrics)) {
        let snapshot = {
            let mut state = self.state();
            update(&mut state.metrics);
            state.metrics.clone()
        };
        if let Err(e) = self.inner.store.save_metrics(&snapshot).await {
            warn!(error = %e, "Failed to persist metrics");
        }
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        // Never held across an await, so a poisoned state is still consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Registers an observer
    ///
    /// The current location, if any, is delivered before this returns.
    pub fn add_listener<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LocationUpdate) + Send + Sync + 'static,
    {
        let current = self.current_location().map(LocationUpdate::Resolved);
        self.inner.observers.subscribe(Arc::new(listener), current)
    }

    // ========================================================================
    // Accessors and operator actions
    // ========================================================================

    pub fn current_location(&self) -> Option<LocationResult> {
        self.state().current.clone()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state().last_updated
    }

    pub fn user_preferences(&self) -> UserPreferences {
        self.state().preferences
    }

    /// Applies and persists a preference change, then wakes the scheduler
    pub async fn set_user_preference(&self, change: PreferenceChange) -> UserPreferences {
        let preferences = {
            let mut state = self.state();
            state.preferences.apply(change);
            state.preferences
        };
        info!(key = change.key(), ?change, "User preference updated");
        if let Err(e) = self.inner.store.save_preferences(&preferences).await {
            warn!(error = %e, "Failed to persist preferences");
        }
        self.inner.preferences_changed.notify_one();
        preferences
    }

    /// Metrics with derived success rates
    pub fn metrics(&self) -> MetricsSummary {
        self.state().metrics.summary()
    }

    pub fn error_state(&self) -> ErrorState {
        self.state().error_state.clone()
    }

    /// Resets the cache record and the metrics, in memory and on disk
    ///
    /// The current in-memory location and the preferences are kept.
    pub async fn clear_cache(&self) {
        {
            let mut state = self.state();
            state.metrics = Metrics::default();
            state.last_known = None;
        }
        if let Err(e) = self.inner.store.clear().await {
            warn!(error = %e, "Failed to remove persisted cache and metrics");
        }
        self.inner.events.report(&TelemetryEvent::CacheCleared);
        info!("Location cache and metrics cleared");
    }

    /// Exports a privacy-reduced diagnostics snapshot
    pub async fn export_diagnostics(&self) -> Diagnostics {
        let battery_level = self.battery_level().await;
        let consent_granted = self.inner.consent.has_consent().await;

        let state = self.state();
        Diagnostics {
            exported_at: Utc::now(),
            device: DeviceCapabilities {
                is_mobile: self.inner.device.is_mobile,
                positioning: self.inner.device.positioning.is_available(),
                battery: self.inner.device.battery.is_available(),
                battery_level,
                consent_granted,
            },
            preferences: state.preferences,
            metrics: state.metrics.summary(),
            current_location: state.current.as_ref().map(|location| LocationSnapshot {
                name: location.display_name(),
                source: location.source,
                last_updated: state.last_updated,
            }),
            error_state: state.error_state.clone(),
        }
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.inner.device
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ========================================================================
    // Scheduling support
    // ========================================================================

    /// Returns true if an automatic resolution is due
    ///
    /// False when automatic updates are off. Otherwise true if nothing was
    /// ever resolved or the frequency-adjusted base interval has elapsed
    /// since the last accepted result.
    pub fn should_update(&self) -> bool {
        let state = self.state();
        if !state.preferences.allows_automatic_updates() {
            return false;
        }
        let base = self
            .inner
            .config
            .schedule
            .base_interval(self.inner.device.is_mobile);
        let Some(interval) = interval::base_interval(base, state.preferences.update_frequency)
        else {
            return false;
        };
        match state.last_updated_at {
            None => true,
            Some(at) => at.elapsed() >= interval,
        }
    }

    /// The adaptive interval to arm next, `None` when no timer should run
    pub async fn next_interval(&self) -> Option<Duration> {
        let (preferences, consecutive_failures) = {
            let state = self.state();
            (
                state.preferences,
                state.error_state.consecutive_failures,
            )
        };
        if !preferences.allows_automatic_updates() {
            return None;
        }
        let battery_level = if preferences.battery_optimization {
            self.battery_level().await
        } else {
            None
        };
        interval::next_interval(&IntervalInputs {
            base: self
                .inner
                .config
                .schedule
                .base_interval(self.inner.device.is_mobile),
            is_mobile: self.inner.device.is_mobile,
            frequency: preferences.update_frequency,
            consecutive_failures,
            battery_level,
            battery_optimization: preferences.battery_optimization,
        })
    }

    /// Records a connectivity transition; returns true if the state changed
    pub fn set_network_online(&self, online: bool) -> bool {
        let mut state = self.state();
        let offline = !online;
        if state.error_state.network_offline == offline {
            return false;
        }
        state.error_state.network_offline = offline;
        info!(online, "Network connectivity changed");
        true
    }

    pub fn is_network_offline(&self) -> bool {
        self.state().error_state.network_offline
    }

    /// Resolves when a preference changes
    pub fn preferences_changed(&self) -> Notified<'_> {
        self.inner.preferences_changed.notified()
    }

    /// Cancels any in-flight positioning; later calls fail fast with `Cancelled`
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    async fn battery_level(&self) -> Option<f64> {
        let monitor = self.inner.device.battery.get()?.clone();
        match monitor.level().await {
            Ok(level) => level.map(|l| l.clamp(0.0, 1.0)),
            Err(e) => {
                debug!(error = %e, "Battery level unavailable");
                None
            }
        }
    }
}
