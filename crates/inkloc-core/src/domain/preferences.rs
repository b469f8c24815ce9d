//! User preferences for automatic location updates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// How often automatic resolution may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFrequency {
    /// Base interval as configured
    #[default]
    Normal,
    /// Base interval doubled before adaptive multipliers
    Reduced,
    /// No timer is ever armed; only explicit refreshes resolve
    Disabled,
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateFrequency::Normal => "normal",
            UpdateFrequency::Reduced => "reduced",
            UpdateFrequency::Disabled => "disabled",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for UpdateFrequency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(UpdateFrequency::Normal),
            "reduced" => Ok(UpdateFrequency::Reduced),
            "disabled" => Ok(UpdateFrequency::Disabled),
            _ => Err(DomainError::InvalidPreferenceValue {
                key: "updateFrequency".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Per-user switches, persisted on every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub auto_location_enabled: bool,
    pub gps_enabled: bool,
    pub update_frequency: UpdateFrequency,
    pub battery_optimization: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            auto_location_enabled: true,
            gps_enabled: true,
            update_frequency: UpdateFrequency::Normal,
            battery_optimization: true,
        }
    }
}

impl UserPreferences {
    /// Returns true if the scheduler may resolve without an explicit request
    pub fn allows_automatic_updates(&self) -> bool {
        self.auto_location_enabled && self.update_frequency != UpdateFrequency::Disabled
    }

    /// Applies a single change in place
    pub fn apply(&mut self, change: PreferenceChange) {
        match change {
            PreferenceChange::AutoLocationEnabled(v) => self.auto_location_enabled = v,
            PreferenceChange::GpsEnabled(v) => self.gps_enabled = v,
            PreferenceChange::UpdateFrequency(v) => self.update_frequency = v,
            PreferenceChange::BatteryOptimization(v) => self.battery_optimization = v,
        }
    }
}

/// A single preference mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceChange {
    AutoLocationEnabled(bool),
    GpsEnabled(bool),
    UpdateFrequency(UpdateFrequency),
    BatteryOptimization(bool),
}

impl PreferenceChange {
    /// Recognised keys, in their persisted camelCase spelling
    pub const KEYS: [&'static str; 4] = [
        "autoLocationEnabled",
        "gpsEnabled",
        "updateFrequency",
        "batteryOptimization",
    ];

    /// Parses a `key`/`value` pair; keys also accept snake_case
    pub fn parse(key: &str, value: &str) -> Result<Self, DomainError> {
        let flag = || parse_bool(key, value);
        match key {
            "autoLocationEnabled" | "auto_location_enabled" => {
                Ok(PreferenceChange::AutoLocationEnabled(flag()?))
            }
            "gpsEnabled" | "gps_enabled" => Ok(PreferenceChange::GpsEnabled(flag()?)),
            "updateFrequency" | "update_frequency" => {
                Ok(PreferenceChange::UpdateFrequency(value.parse()?))
            }
            "batteryOptimization" | "battery_optimization" => {
                Ok(PreferenceChange::BatteryOptimization(flag()?))
            }
            other => Err(DomainError::UnknownPreference(other.to_string())),
        }
    }

    /// The persisted key this change targets
    pub fn key(&self) -> &'static str {
        match self {
            PreferenceChange::AutoLocationEnabled(_) => "autoLocationEnabled",
            PreferenceChange::GpsEnabled(_) => "gpsEnabled",
            PreferenceChange::UpdateFrequency(_) => "updateFrequency",
            PreferenceChange::BatteryOptimization(_) => "batteryOptimization",
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DomainError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(DomainError::InvalidPreferenceValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_all_on() {
        let prefs = UserPreferences::default();
        assert!(prefs.auto_location_enabled);
        assert!(prefs.gps_enabled);
        assert!(prefs.battery_optimization);
        assert_eq!(prefs.update_frequency, UpdateFrequency::Normal);
        assert!(prefs.allows_automatic_updates());
    }

    #[test]
    fn test_parse_and_apply() {
        let mut prefs = UserPreferences::default();
        prefs.apply(PreferenceChange::parse("updateFrequency", "disabled").unwrap());
        prefs.apply(PreferenceChange::parse("gps_enabled", "off").unwrap());
        assert_eq!(prefs.update_frequency, UpdateFrequency::Disabled);
        assert!(!prefs.gps_enabled);
        assert!(!prefs.allows_automatic_updates());
    }

    #[test]
    fn test_parse_rejects_unknown_key_and_bad_value() {
        assert!(matches!(
            PreferenceChange::parse("darkMode", "true"),
            Err(DomainError::UnknownPreference(_))
        ));
        assert!(matches!(
            PreferenceChange::parse("gpsEnabled", "sometimes"),
            Err(DomainError::InvalidPreferenceValue { .. })
        ));
        assert!(PreferenceChange::parse("updateFrequency", "hourly").is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let prefs: UserPreferences =
            serde_json::from_str(r#"{"updateFrequency":"reduced"}"#).unwrap();
        assert_eq!(prefs.update_frequency, UpdateFrequency::Reduced);
        assert!(prefs.gps_enabled);
    }
}
