//! One-time capability detection

use std::path::Path;
use std::sync::Arc;

use inkloc_core::config::DeviceConfig;
use inkloc_core::ports::DeviceProfile;
use tracing::{info, warn};

use crate::battery::{SysfsBatteryMonitor, POWER_SUPPLY_ROOT};
use crate::position::FixedPositionProvider;

/// Builds the device profile from configuration and the host's sysfs
pub fn detect_device_profile(config: &DeviceConfig) -> DeviceProfile {
    detect_device_profile_in(config, Path::new(POWER_SUPPLY_ROOT))
}

/// Same as [`detect_device_profile`] with a custom power-supply root
pub fn detect_device_profile_in(config: &DeviceConfig, power_supply_root: &Path) -> DeviceProfile {
    let mut profile = DeviceProfile::bare(config.mobile);

    if let Some(fixed) = config.fixed_position {
        profile = profile.with_positioning(Arc::new(FixedPositionProvider::from(fixed)));
    }

    let battery = match &config.battery_path {
        Some(dir) => {
            let monitor = SysfsBatteryMonitor::new(dir.clone());
            if monitor.is_present() {
                Some(monitor)
            } else {
                warn!(path = %dir.display(), "Configured battery has no capacity file, ignoring");
                None
            }
        }
        None => SysfsBatteryMonitor::discover(power_supply_root),
    };
    if let Some(monitor) = battery {
        profile = profile.with_battery(Arc::new(monitor));
    }

    info!(
        mobile = profile.is_mobile,
        positioning = profile.positioning.is_available(),
        battery = profile.battery.is_available(),
        "Device capabilities detected"
    );
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkloc_core::config::FixedPositionConfig;
    use inkloc_core::ports::IBatteryMonitor;

    #[test]
    fn test_defaults_have_no_capabilities() {
        let root = tempfile::tempdir().unwrap();
        let profile = detect_device_profile_in(&DeviceConfig::default(), root.path());

        assert!(!profile.is_mobile);
        assert!(!profile.positioning.is_available());
        assert!(!profile.battery.is_available());
    }

    #[tokio::test]
    async fn test_detects_battery_and_fixed_position() {
        let root = tempfile::tempdir().unwrap();
        let bat = root.path().join("BAT0");
        std::fs::create_dir_all(&bat).unwrap();
        std::fs::write(bat.join("type"), "Battery\n").unwrap();
        std::fs::write(bat.join("capacity"), "18\n").unwrap();

        let config = DeviceConfig {
            mobile: true,
            battery_path: None,
            fixed_position: Some(FixedPositionConfig {
                latitude: 39.1,
                longitude: -76.8,
                accuracy_m: 50.0,
            }),
        };
        let profile = detect_device_profile_in(&config, root.path());

        assert!(profile.is_mobile);
        assert!(profile.positioning.is_available());
        let level = profile.battery.get().unwrap().level().await.unwrap();
        assert_eq!(level, Some(0.18));
    }

    #[test]
    fn test_configured_battery_path_must_exist() {
        let root = tempfile::tempdir().unwrap();
        let config = DeviceConfig {
            battery_path: Some(root.path().join("BAT9")),
            ..DeviceConfig::default()
        };

        let profile = detect_device_profile_in(&config, root.path());
        assert!(!profile.battery.is_available());
    }
}
