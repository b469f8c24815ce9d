//! In-memory fakes of every port, shared by the service and scheduler tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use inkloc_core::config::Config;
use inkloc_core::domain::{
    CacheRecord, ConsentRecord, LocationResult, LocationSource, StrategyError,
};
use inkloc_core::ports::{
    DeviceProfile, IBatteryMonitor, IConsentStore, IEventSink, IKeyValueStore, ILocationApi,
    IPositionProvider, MemoryKeyValueStore, Position, PositionOptions, PreciseLocationRequest,
    TelemetryEvent,
};

use crate::service::{LocationService, ServiceDependencies};
use crate::store::LocationStore;

// ============================================================================
// Location API
// ============================================================================

pub(crate) struct FakeApi {
    ip: Mutex<Result<LocationResult, StrategyError>>,
    reverse: Mutex<Result<LocationResult, StrategyError>>,
    ip_calls: AtomicUsize,
    requests: Mutex<Vec<PreciseLocationRequest>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            ip: Mutex::new(Ok(LocationResult::new("Laurel", "MD", "US", LocationSource::Ip))),
            reverse: Mutex::new(Ok(LocationResult::new(
                "Columbia",
                "MD",
                "US",
                LocationSource::Ip,
            ))),
            ip_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_ip(&self, location: LocationResult) {
        *self.ip.lock().unwrap() = Ok(location);
    }

    pub fn fail_ip(&self, err: StrategyError) {
        *self.ip.lock().unwrap() = Err(err);
    }

    pub fn set_reverse(&self, location: LocationResult) {
        *self.reverse.lock().unwrap() = Ok(location);
    }

    pub fn fail_reverse(&self, err: StrategyError) {
        *self.reverse.lock().unwrap() = Err(err);
    }

    pub fn ip_calls(&self) -> usize {
        self.ip_calls.load(Ordering::SeqCst)
    }

    pub fn reverse_requests(&self) -> Vec<PreciseLocationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ILocationApi for FakeApi {
    async fn reverse_geocode(
        &self,
        request: &PreciseLocationRequest,
    ) -> Result<LocationResult, StrategyError> {
        self.requests.lock().unwrap().push(*request);
        self.reverse.lock().unwrap().clone()
    }

    async fn lookup_ip(&self) -> Result<LocationResult, StrategyError> {
        self.ip_calls.fetch_add(1, Ordering::SeqCst);
        self.ip.lock().unwrap().clone()
    }
}

// ============================================================================
// Positioning
// ============================================================================

#[derive(Clone)]
pub(crate) enum PositionBehavior {
    Fix(Position),
    Fail(StrategyError),
    /// Never answers; only cancellation ends the call
    Hang,
}

impl PositionBehavior {
    pub fn fix(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        PositionBehavior::Fix(Position {
            latitude,
            longitude,
            accuracy_m,
        })
    }
}

pub(crate) struct FakePositioning {
    behavior: Mutex<PositionBehavior>,
    calls: AtomicUsize,
    last_options: Mutex<Option<PositionOptions>>,
}

impl FakePositioning {
    fn new() -> Self {
        Self {
            behavior: Mutex::new(PositionBehavior::fix(39.2037, -76.8610, 35.0)),
            calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn set(&self, behavior: PositionBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<PositionOptions> {
        *self.last_options.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl IPositionProvider for FakePositioning {
    async fn current_position(
        &self,
        options: PositionOptions,
        cancel: CancellationToken,
    ) -> Result<Position, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options);
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            PositionBehavior::Fix(position) => Ok(position),
            PositionBehavior::Fail(err) => Err(err),
            PositionBehavior::Hang => {
                cancel.cancelled().await;
                Err(StrategyError::Cancelled)
            }
        }
    }
}

// ============================================================================
// Consent, battery, events, failing storage
// ============================================================================

pub(crate) struct FakeConsent(Mutex<Option<ConsentRecord>>);

impl FakeConsent {
    pub fn clear(&self) {
        *self.0.lock().unwrap() = None;
    }

    pub fn set_granted_at(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap() = Some(ConsentRecord::location(true, at));
    }
}

#[async_trait::async_trait]
impl IConsentStore for FakeConsent {
    async fn load(&self) -> anyhow::Result<Option<ConsentRecord>> {
        Ok(self.0.lock().unwrap().clone())
    }
}

pub(crate) struct FakeBattery(Mutex<Option<f64>>);

#[async_trait::async_trait]
impl IBatteryMonitor for FakeBattery {
    async fn level(&self) -> anyhow::Result<Option<f64>> {
        Ok(*self.0.lock().unwrap())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink(Mutex<Vec<TelemetryEvent>>);

impl RecordingSink {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl IEventSink for RecordingSink {
    fn report(&self, event: &TelemetryEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

pub(crate) struct FailingStore;

#[async_trait::async_trait]
impl IKeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("storage quota exceeded")
    }

    async fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage quota exceeded")
    }

    async fn remove(&self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("storage quota exceeded")
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Wires fakes into a service; `service()` may be called repeatedly to
/// simulate a restart over the same storage
pub(crate) struct Harness {
    pub api: Arc<FakeApi>,
    pub positioning: Arc<FakePositioning>,
    pub consent: Arc<FakeConsent>,
    pub sink: Arc<RecordingSink>,
    pub kv: Arc<MemoryKeyValueStore>,
    pub config: Config,
    mobile: bool,
    with_positioning: bool,
    battery: Option<f64>,
    failing_storage: bool,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            api: Arc::new(FakeApi::new()),
            positioning: Arc::new(FakePositioning::new()),
            consent: Arc::new(FakeConsent(Mutex::new(Some(ConsentRecord::location(
                true,
                Utc::now(),
            ))))),
            sink: Arc::new(RecordingSink::default()),
            kv: Arc::new(MemoryKeyValueStore::new()),
            config: Config::default(),
            mobile: false,
            with_positioning: true,
            battery: None,
            failing_storage: false,
        }
    }

    pub fn mobile(mut self) -> Self {
        self.mobile = true;
        self
    }

    pub fn without_positioning(mut self) -> Self {
        self.with_positioning = false;
        self
    }

    pub fn with_battery(mut self, level: f64) -> Self {
        self.battery = Some(level);
        self
    }

    pub fn with_failing_storage(mut self) -> Self {
        self.failing_storage = true;
        self
    }

    pub fn deps(&self) -> ServiceDependencies {
        let mut device = DeviceProfile::bare(self.mobile);
        if self.with_positioning {
            device = device.with_positioning(self.positioning.clone());
        }
        if let Some(level) = self.battery {
            device = device.with_battery(Arc::new(FakeBattery(Mutex::new(Some(level)))));
        }
        let storage: Arc<dyn IKeyValueStore> = if self.failing_storage {
            Arc::new(FailingStore)
        } else {
            self.kv.clone()
        };
        ServiceDependencies {
            config: self.config.clone(),
            device,
            api: self.api.clone(),
            storage,
            consent: self.consent.clone(),
            events: self.sink.clone(),
        }
    }

    pub async fn service(&self) -> LocationService {
        LocationService::load(self.deps()).await
    }

    fn store(&self) -> LocationStore {
        LocationStore::new(self.kv.clone(), self.config.storage.keys.clone())
    }

    /// Writes an IP-sourced cache record for `city`, MD stamped at `at`
    pub async fn seed_cache(&self, city: &str, at: DateTime<Utc>) {
        let record = CacheRecord::new(
            LocationResult::new(city, "MD", "US", LocationSource::Ip),
            at,
        );
        self.store().save_cache(&record).await.unwrap();
    }

    pub async fn persisted_cache(&self) -> Option<CacheRecord> {
        self.store().load_cache().await.unwrap()
    }
}
