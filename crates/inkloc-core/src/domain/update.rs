//! Payloads delivered to location observers

use serde::Serialize;

use super::location::LocationResult;

/// What an observer receives
///
/// `Resolved` is sent after every accepted change and immediately on
/// subscribe. `Degraded` is sent after a total resolution failure and carries
/// the last-known location, which may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationUpdate {
    Resolved(LocationResult),
    #[serde(rename_all = "camelCase")]
    Degraded {
        last_known: Option<LocationResult>,
        error_message: String,
        error_count: u32,
    },
}

impl LocationUpdate {
    /// Returns true for failure notifications
    pub fn is_error(&self) -> bool {
        matches!(self, LocationUpdate::Degraded { .. })
    }

    /// The location carried by this update, if any
    pub fn location(&self) -> Option<&LocationResult> {
        match self {
            LocationUpdate::Resolved(location) => Some(location),
            LocationUpdate::Degraded { last_known, .. } => last_known.as_ref(),
        }
    }
}
