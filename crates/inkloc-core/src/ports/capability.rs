//! Optional device capabilities
//!
//! A capability is probed once when the device profile is built. Absence is
//! a normal state, never an error: the resolver simply skips the strategy or
//! multiplier that needs it.

use std::sync::Arc;

use super::battery::IBatteryMonitor;
use super::position::IPositionProvider;

/// An optional capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Available(T),
    Unavailable,
}

impl<T> Capability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    /// Borrows the capability, if present
    pub fn get(&self) -> Option<&T> {
        match self {
            Capability::Available(value) => Some(value),
            Capability::Unavailable => None,
        }
    }
}

impl<T> Default for Capability<T> {
    fn default() -> Self {
        Capability::Unavailable
    }
}

impl<T> From<Option<T>> for Capability<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Capability::Available(v),
            None => Capability::Unavailable,
        }
    }
}

/// Device class and the capabilities detected at startup
#[derive(Clone, Default)]
pub struct DeviceProfile {
    /// Mobile devices get longer intervals and timeouts
    pub is_mobile: bool,
    pub positioning: Capability<Arc<dyn IPositionProvider>>,
    pub battery: Capability<Arc<dyn IBatteryMonitor>>,
}

impl DeviceProfile {
    /// A profile with no optional capabilities
    pub fn bare(is_mobile: bool) -> Self {
        Self {
            is_mobile,
            ..Self::default()
        }
    }

    pub fn with_positioning(mut self, provider: Arc<dyn IPositionProvider>) -> Self {
        self.positioning = Capability::Available(provider);
        self
    }

    pub fn with_battery(mut self, monitor: Arc<dyn IBatteryMonitor>) -> Self {
        self.battery = Capability::Available(monitor);
        self
    }
}

impl std::fmt::Debug for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProfile")
            .field("is_mobile", &self.is_mobile)
            .field("positioning", &self.positioning.is_available())
            .field("battery", &self.battery.is_available())
            .finish()
    }
}
