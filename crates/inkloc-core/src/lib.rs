//! InkLoc Core - Domain types, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `LocationResult`, `CacheRecord`, `Metrics`, `UserPreferences`,
//!   `ConsentRecord`, `ErrorState`, `LocationUpdate`
//! - **Port definitions** - Traits for adapters: `IPositionProvider`, `ILocationApi`,
//!   `IKeyValueStore`, `IConsentStore`, `IBatteryMonitor`, `IEventSink`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure data and rules with no I/O.
//! Ports define trait interfaces that adapter crates implement; the
//! `inkloc-resolver` crate orchestrates domain types through those ports.

pub mod config;
pub mod domain;
pub mod ports;
