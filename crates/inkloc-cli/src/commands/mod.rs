pub mod cache;
pub mod config;
pub mod consent;
pub mod diagnostics;
pub mod locate;
pub mod metrics;
pub mod prefs;
