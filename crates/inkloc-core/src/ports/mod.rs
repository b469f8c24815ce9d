//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the resolver depends on; their
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IPositionProvider`] - On-device positioning
//! - [`ILocationApi`] - Reverse lookup and network-address lookup endpoints
//! - [`IKeyValueStore`] - Local persistence of cache, metrics and preferences
//! - [`IConsentStore`] - Read-only access to the external consent record
//! - [`IBatteryMonitor`] - Battery level, when the device reports one
//! - [`IEventSink`] - Fire-and-forget telemetry ("report an event")
//!
//! Optional capabilities are wrapped in [`Capability`] and decided once at
//! startup in a [`DeviceProfile`].

pub mod battery;
pub mod capability;
pub mod consent_store;
pub mod events;
pub mod key_value;
pub mod location_api;
pub mod position;

pub use battery::IBatteryMonitor;
pub use capability::{Capability, DeviceProfile};
pub use consent_store::IConsentStore;
pub use events::{IEventSink, NoopEventSink, TelemetryEvent};
pub use key_value::{IKeyValueStore, MemoryKeyValueStore};
pub use location_api::{ILocationApi, PreciseLocationRequest};
pub use position::{IPositionProvider, Position, PositionOptions};
