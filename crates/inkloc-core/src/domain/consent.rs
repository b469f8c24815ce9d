//! Externally owned consent record
//!
//! The consent-management concern writes this record; InkLoc only reads it.
//! Other consent categories in the stored JSON are preserved but ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A user's time-bounded grant for data-use categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Whether location use was granted
    #[serde(default)]
    pub location: bool,
    /// Epoch milliseconds at which the consent was given
    pub timestamp: i64,
    /// Other categories owned by the consent manager
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl ConsentRecord {
    /// Creates a location-only record stamped with `at`
    pub fn location(granted: bool, at: DateTime<Utc>) -> Self {
        Self {
            location: granted,
            timestamp: at.timestamp_millis(),
            other: BTreeMap::new(),
        }
    }

    /// Returns true if location is granted and the grant is at most `max_age` old
    pub fn grants_location(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.location && now.timestamp_millis() - self.timestamp <= max_age.num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_expires_after_max_age() {
        let now = Utc::now();
        let max_age = Duration::days(30);
        assert!(ConsentRecord::location(true, now - Duration::days(29)).grants_location(now, max_age));
        assert!(!ConsentRecord::location(true, now - Duration::days(31)).grants_location(now, max_age));
        assert!(!ConsentRecord::location(false, now).grants_location(now, max_age));
    }

    #[test]
    fn test_grant_exactly_max_age_old_is_valid() {
        let now = Utc::now();
        let max_age = Duration::days(30);
        assert!(ConsentRecord::location(true, now - max_age).grants_location(now, max_age));
        assert!(!ConsentRecord::location(true, now - max_age - Duration::milliseconds(1))
            .grants_location(now, max_age));
    }

    #[test]
    fn test_preserves_other_categories() {
        let json = r#"{"location":true,"timestamp":1700000000000,"analytics":false}"#;
        let record: ConsentRecord = serde_json::from_str(json).unwrap();
        assert!(record.location);
        assert_eq!(record.other["analytics"], serde_json::Value::Bool(false));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["analytics"], false);
    }
}
