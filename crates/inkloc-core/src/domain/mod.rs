//! Domain entities and rules
//!
//! This module contains the core domain types for InkLoc:
//! - Location results and the persisted cache record
//! - Cumulative resolution metrics and their derived summary
//! - User preferences and the closed set of preference changes
//! - Externally owned consent records
//! - Transient error state and observer payloads
//! - Domain-specific error types

pub mod consent;
pub mod error_state;
pub mod errors;
pub mod location;
pub mod metrics;
pub mod preferences;
pub mod update;

// Re-export commonly used types
pub use consent::ConsentRecord;
pub use error_state::{ErrorState, LastError};
pub use errors::{DomainError, StrategyError, StrategyErrorKind};
pub use location::{CacheRecord, Coordinates, LocationResult, LocationSource};
pub use metrics::{format_rate, Metrics, MetricsSummary, Strategy};
pub use preferences::{PreferenceChange, UpdateFrequency, UserPreferences};
pub use update::LocationUpdate;
