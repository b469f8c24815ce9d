//! InkLoc Device - capability adapters for the host
//!
//! - [`battery::SysfsBatteryMonitor`] - battery level from the Linux
//!   power-supply class
//! - [`position::FixedPositionProvider`] - a configured static fix for
//!   kiosk deployments
//! - [`profile::detect_device_profile`] - probes both once at startup
//! - [`network::SysfsConnectivity`] - interface state from the Linux
//!   network class, polled by the daemon

pub mod battery;
pub mod network;
pub mod position;
pub mod profile;

pub use battery::SysfsBatteryMonitor;
pub use network::SysfsConnectivity;
pub use position::FixedPositionProvider;
pub use profile::{detect_device_profile, detect_device_profile_in};
