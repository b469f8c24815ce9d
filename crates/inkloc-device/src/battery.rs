//! Battery level from `/sys/class/power_supply`

use std::path::{Path, PathBuf};

use anyhow::Context;
use inkloc_core::ports::IBatteryMonitor;
use tracing::debug;

/// Default root of the power-supply class
pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Reads `capacity` (a percentage) from one power-supply directory
#[derive(Debug, Clone)]
pub struct SysfsBatteryMonitor {
    dir: PathBuf,
}

impl SysfsBatteryMonitor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Finds the first battery under `root`, by name order
    ///
    /// A directory counts as a battery when its `type` file reads `Battery`
    /// and it exposes `capacity`.
    pub fn discover(root: &Path) -> Option<Self> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_battery(path))
            .collect();
        candidates.sort();
        let dir = candidates.into_iter().next()?;
        debug!(path = %dir.display(), "Battery found");
        Some(Self::new(dir))
    }

    /// Whether `dir` currently exposes a readable capacity file
    pub fn is_present(&self) -> bool {
        self.dir.join("capacity").is_file()
    }
}

fn is_battery(dir: &Path) -> bool {
    let kind = std::fs::read_to_string(dir.join("type")).unwrap_or_default();
    kind.trim() == "Battery" && dir.join("capacity").is_file()
}

#[async_trait::async_trait]
impl IBatteryMonitor for SysfsBatteryMonitor {
    async fn level(&self) -> anyhow::Result<Option<f64>> {
        let path = self.dir.join("capacity");
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };
        let percent: u8 = raw
            .trim()
            .parse()
            .with_context(|| format!("Unexpected capacity value {:?}", raw.trim()))?;
        Ok(Some(f64::from(percent.min(100)) / 100.0))
    }
}
