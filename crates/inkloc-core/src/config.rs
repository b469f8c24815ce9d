//! Configuration module for InkLoc.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for InkLoc.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub device: DeviceConfig,
    pub schedule: ScheduleConfig,
    pub positioning: PositioningConfig,
    pub storage: StorageConfig,
    pub consent: ConsentConfig,
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
}

/// Location endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Origin serving `/api/location` and `/api/location/precise`.
    pub base_url: String,
    /// Upper bound for a single lookup request, in seconds.
    pub request_timeout_secs: u64,
}

/// Device class and optional capability sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Treat this host as a mobile device (longer intervals and timeouts).
    pub mobile: bool,
    /// sysfs power-supply directory; auto-detected under
    /// `/sys/class/power_supply` when unset.
    pub battery_path: Option<PathBuf>,
    /// Static position for kiosk deployments. Positioning is unavailable
    /// when unset.
    pub fixed_position: Option<FixedPositionConfig>,
}

/// A statically configured position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPositionConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    #[serde(default = "default_fixed_accuracy")]
    pub accuracy_m: f64,
}

fn default_fixed_accuracy() -> f64 {
    50.0
}

/// Automatic resolution schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Base interval on desktop-class devices, in seconds.
    pub desktop_interval_secs: u64,
    /// Base interval on mobile devices, in seconds.
    pub mobile_interval_secs: u64,
    /// Delay after connectivity returns before resolving, in milliseconds.
    pub online_settle_ms: u64,
}

/// On-device positioning timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    pub desktop_timeout_secs: u64,
    pub mobile_timeout_secs: u64,
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file holding the key-value records.
    pub database: PathBuf,
    /// Age after which a cached location is ignored at startup, in hours.
    pub cache_ttl_hours: u64,
    /// Well-known keys of the persisted records.
    pub keys: StorageKeys,
}

/// Well-known keys in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub cache: String,
    pub metrics: String,
    pub preferences: String,
    /// Written by the consent manager, read-only for the resolver.
    pub consent: String,
}

/// Consent validity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    /// A location grant older than this is treated as absent.
    pub max_age_days: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub metrics_enabled: bool,
    /// Socket address for the `/metrics` endpoint.
    pub metrics_endpoint: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/inkloc/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("inkloc")
            .join("config.yaml")
    }

    /// Serialize to YAML, as written by `inkloc config init`.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Derived durations
// ---------------------------------------------------------------------------

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ScheduleConfig {
    /// Base interval for the device class, before any multiplier.
    pub fn base_interval(&self, is_mobile: bool) -> Duration {
        if is_mobile {
            Duration::from_secs(self.mobile_interval_secs)
        } else {
            Duration::from_secs(self.desktop_interval_secs)
        }
    }

    pub fn online_settle(&self) -> Duration {
        Duration::from_millis(self.online_settle_ms)
    }
}

impl PositioningConfig {
    pub fn timeout(&self, is_mobile: bool) -> Duration {
        if is_mobile {
            Duration::from_secs(self.mobile_timeout_secs)
        } else {
            Duration::from_secs(self.desktop_timeout_secs)
        }
    }
}

impl StorageConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_ttl_hours as i64)
    }
}

impl ConsentConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.max_age_days as i64)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            desktop_interval_secs: 10 * 60,
            mobile_interval_secs: 15 * 60,
            online_settle_ms: 1000,
        }
    }
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            desktop_timeout_secs: 8,
            mobile_timeout_secs: 12,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("inkloc");
        Self {
            database: data_dir.join("inkloc.db"),
            cache_ttl_hours: 24,
            keys: StorageKeys::default(),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            cache: "studio_location_cache".to_string(),
            metrics: "studio_location_metrics".to_string(),
            preferences: "studio_location_preferences".to_string(),
            consent: "studio_cookie_consent".to_string(),
        }
    }
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self { max_age_days: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_endpoint: "127.0.0.1:9464".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"schedule.mobile_interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            errors.push(ValidationError::new(
                "api.base_url",
                format!("must be an http(s) URL, got '{}'", self.api.base_url),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "api.request_timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- device ---
        if let Some(fixed) = &self.device.fixed_position {
            if !(-90.0..=90.0).contains(&fixed.latitude) {
                errors.push(ValidationError::new(
                    "device.fixed_position.latitude",
                    "must be between -90 and 90",
                ));
            }
            if !(-180.0..=180.0).contains(&fixed.longitude) {
                errors.push(ValidationError::new(
                    "device.fixed_position.longitude",
                    "must be between -180 and 180",
                ));
            }
            if fixed.accuracy_m.is_nan() || fixed.accuracy_m < 0.0 {
                errors.push(ValidationError::new(
                    "device.fixed_position.accuracy_m",
                    "must not be negative",
                ));
            }
        }

        // --- schedule ---
        if self.schedule.desktop_interval_secs == 0 {
            errors.push(ValidationError::new(
                "schedule.desktop_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.schedule.mobile_interval_secs == 0 {
            errors.push(ValidationError::new(
                "schedule.mobile_interval_secs",
                "must be greater than 0",
            ));
        }

        // --- positioning ---
        if self.positioning.desktop_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "positioning.desktop_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.positioning.mobile_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "positioning.mobile_timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- storage ---
        if self.storage.cache_ttl_hours == 0 {
            errors.push(ValidationError::new(
                "storage.cache_ttl_hours",
                "must be greater than 0",
            ));
        }
        let keys = [
            ("storage.keys.cache", &self.storage.keys.cache),
            ("storage.keys.metrics", &self.storage.keys.metrics),
            ("storage.keys.preferences", &self.storage.keys.preferences),
            ("storage.keys.consent", &self.storage.keys.consent),
        ];
        for (i, (field, key)) in keys.iter().enumerate() {
            if key.trim().is_empty() {
                errors.push(ValidationError::new(*field, "must not be empty"));
            } else if keys[..i].iter().any(|(_, other)| other == key) {
                errors.push(ValidationError::new(
                    *field,
                    format!("duplicates another storage key: '{key}'"),
                ));
            }
        }

        // --- consent ---
        if self.consent.max_age_days == 0 {
            errors.push(ValidationError::new(
                "consent.max_age_days",
                "must be greater than 0",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid log level '{}'; expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        // --- telemetry ---
        if self.telemetry.metrics_enabled
            && self
                .telemetry
                .metrics_endpoint
                .parse::<std::net::SocketAddr>()
                .is_err()
        {
            errors.push(ValidationError::new(
                "telemetry.metrics_endpoint",
                format!(
                    "not a socket address: '{}'",
                    self.telemetry.metrics_endpoint
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`]. Starts from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.api.request_timeout_secs = seconds;
        self
    }

    // --- device ---

    pub fn device_mobile(mut self, mobile: bool) -> Self {
        self.config.device.mobile = mobile;
        self
    }

    pub fn device_battery_path(mut self, path: PathBuf) -> Self {
        self.config.device.battery_path = Some(path);
        self
    }

    pub fn device_fixed_position(mut self, latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        self.config.device.fixed_position = Some(FixedPositionConfig {
            latitude,
            longitude,
            accuracy_m,
        });
        self
    }

    // --- schedule ---

    pub fn schedule_desktop_interval_secs(mut self, seconds: u64) -> Self {
        self.config.schedule.desktop_interval_secs = seconds;
        self
    }

    pub fn schedule_mobile_interval_secs(mut self, seconds: u64) -> Self {
        self.config.schedule.mobile_interval_secs = seconds;
        self
    }

    pub fn schedule_online_settle_ms(mut self, millis: u64) -> Self {
        self.config.schedule.online_settle_ms = millis;
        self
    }

    // --- positioning ---

    pub fn positioning_desktop_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.positioning.desktop_timeout_secs = seconds;
        self
    }

    pub fn positioning_mobile_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.positioning.mobile_timeout_secs = seconds;
        self
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    pub fn storage_cache_ttl_hours(mut self, hours: u64) -> Self {
        self.config.storage.cache_ttl_hours = hours;
        self
    }

    pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
        self.config.storage.keys = keys;
        self
    }

    // --- consent ---

    pub fn consent_max_age_days(mut self, days: u64) -> Self {
        self.config.consent.max_age_days = days;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- telemetry ---

    pub fn telemetry_metrics_enabled(mut self, enabled: bool) -> Self {
        self.config.telemetry.metrics_enabled = enabled;
        self
    }

    pub fn telemetry_metrics_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.telemetry.metrics_endpoint = endpoint.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
