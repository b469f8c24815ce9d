//! Shared setup for commands that touch the local store or the resolver

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use inkloc_cache::{DatabasePool, SqliteKeyValueStore};
use inkloc_core::config::Config;
use inkloc_core::ports::{IKeyValueStore, NoopEventSink};
use inkloc_device::detect_device_profile;
use inkloc_http::client::LocationApiClient;
use inkloc_resolver::{KeyValueConsentStore, LocationService, ServiceDependencies};

/// Configuration resolved from the command line
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: Config,
}

impl CliContext {
    /// Loads and validates the configuration; a missing file means defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = if config_path.exists() {
            Config::load(config_path).with_context(|| {
                format!("Failed to load configuration from {}", config_path.display())
            })?
        } else {
            Config::default()
        };

        let errors = config.validate();
        if !errors.is_empty() {
            let report: Vec<String> = errors.iter().map(ToString::to_string).collect();
            anyhow::bail!(
                "Invalid configuration ({}):\n  {}",
                config_path.display(),
                report.join("\n  ")
            );
        }
        Ok(Self::with_config(config_path.to_path_buf(), config))
    }

    pub fn with_config(config_path: PathBuf, config: Config) -> Self {
        Self {
            config_path,
            config,
        }
    }

    /// Opens the database without building a resolver
    pub async fn open_store(&self) -> Result<Store> {
        let pool = DatabasePool::new(&self.config.storage.database)
            .await
            .context("Failed to open database")?;
        let kv: Arc<dyn IKeyValueStore> = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
        let consent = KeyValueConsentStore::new(
            Arc::clone(&kv),
            self.config.storage.keys.consent.clone(),
        );
        Ok(Store { pool, kv, consent })
    }

    /// Opens the database and restores a resolver over it
    pub async fn open_service(&self) -> Result<Session> {
        let store = self.open_store().await?;
        let api = Arc::new(
            LocationApiClient::new(&self.config.api).context("Failed to create API client")?,
        );
        let service = LocationService::load(ServiceDependencies {
            config: self.config.clone(),
            device: detect_device_profile(&self.config.device),
            api,
            storage: Arc::clone(&store.kv),
            consent: Arc::new(store.consent.clone()),
            events: Arc::new(NoopEventSink),
        })
        .await;
        Ok(Session { store, service })
    }
}

/// An open database with the consent adapter over it
pub struct Store {
    pub pool: DatabasePool,
    pub kv: Arc<dyn IKeyValueStore>,
    pub consent: KeyValueConsentStore,
}

impl Store {
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// A resolver bound to an open database
pub struct Session {
    pub store: Store,
    pub service: LocationService,
}

impl Session {
    pub async fn close(self) {
        self.service.shutdown();
        self.store.close().await;
    }
}
