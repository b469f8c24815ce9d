//! Transient error state (never persisted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent total resolution failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Stable error code, e.g. `"no_location_available"`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Failure bookkeeping shared by the resolver and the scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorState {
    pub consecutive_failures: u32,
    pub last_error: Option<LastError>,
    pub network_offline: bool,
}

impl ErrorState {
    /// Records a failure and returns the new consecutive count
    pub fn record_failure(
        &mut self,
        message: impl Into<String>,
        kind: impl Into<String>,
        at: DateTime<Utc>,
    ) -> u32 {
        self.consecutive_failures += 1;
        self.last_error = Some(LastError {
            message: message.into(),
            timestamp: at,
            kind: kind.into(),
        });
        self.consecutive_failures
    }

    /// Resets the failure streak after any successful resolution
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_resets_streak() {
        let mut state = ErrorState::default();
        state.record_failure("boom", "no_location_available", Utc::now());
        assert_eq!(state.record_failure("boom", "no_location_available", Utc::now()), 2);

        state.record_success();
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let mut state = ErrorState::default();
        state.record_failure("nothing", "no_location_available", Utc::now());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["lastError"]["type"], "no_location_available");
        assert_eq!(json["consecutiveFailures"], 1);
    }
}
