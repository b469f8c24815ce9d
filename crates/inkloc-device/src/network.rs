//! Connectivity from `/sys/class/net`

use std::path::{Path, PathBuf};

use tracing::debug;

/// Default root of the network class
pub const NET_CLASS_ROOT: &str = "/sys/class/net";

/// Reports whether any non-loopback interface is up
#[derive(Debug, Clone)]
pub struct SysfsConnectivity {
    root: PathBuf,
}

impl Default for SysfsConnectivity {
    fn default() -> Self {
        Self::new(NET_CLASS_ROOT)
    }
}

impl SysfsConnectivity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Some(true)` when an interface other than `lo` has `operstate` up
    ///
    /// Point-to-point tunnels report `unknown` while passing traffic and
    /// count as up.
    ///
    /// Returns `None` when the class directory cannot be read, in which case
    /// connectivity is unknown and callers should leave their state alone.
    pub async fn is_online(&self) -> Option<bool> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %self.root.display(), error = %e, "Network class unreadable");
                return None;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name() == "lo" {
                continue;
            }
            let state = tokio::fs::read_to_string(entry.path().join("operstate"))
                .await
                .unwrap_or_default();
            if matches!(state.trim(), "up" | "unknown") {
                return Some(true);
            }
        }
        Some(false)
    }
}
