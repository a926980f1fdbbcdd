#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, PoisonError},
};

use serde::Serialize;
use which::which;

use crate::constants::KNOWN_TOOLS;

/// Resolves tool names on `PATH`, remembering each answer for the lifetime of
/// the probe. One probe belongs to one grading invocation, so a tool
/// installed between runs is always seen by the next run.
#[derive(Debug, Default)]
pub struct ToolProbe {
    /// Tool name to presence.
    cache: Mutex<HashMap<String, bool>>,
}

impl ToolProbe {
    /// Creates an empty probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` resolves to an executable on `PATH`.
    pub fn is_present(&self, name: &str) -> bool {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&present) = cache.get(name) {
            return present;
        }

        let present = which(name).is_ok();
        tracing::debug!(tool = name, present, "probed tool");
        cache.insert(name.to_string(), present);
        present
    }
}

/// Informational description of the machine a run happened on. Never
/// affects scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvSnapshot {
    /// OS, architecture and, when readable, kernel release.
    pub platform: String,
    /// Name and version of the grader itself.
    pub runtime:  String,
    /// Whether the kernel identifies as Windows Subsystem for Linux.
    pub wsl:      bool,
    /// Presence of each known optional tool.
    pub tools:    BTreeMap<String, bool>,
}

impl EnvSnapshot {
    /// Captures the snapshot, probing every tool in [`KNOWN_TOOLS`].
    pub fn capture(probe: &ToolProbe) -> Self {
        let tools = KNOWN_TOOLS
            .iter()
            .map(|tool| (tool.to_string(), probe.is_present(tool)))
            .collect();

        Self {
            platform: platform_string(),
            runtime: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            wsl: is_wsl(),
            tools,
        }
    }
}

/// `<os>-<arch>[-<kernel release>]`.
fn platform_string() -> String {
    let mut platform = format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(release) = std::fs::read_to_string("/proc/sys/kernel/osrelease") {
        let release = release.trim();
        if !release.is_empty() {
            platform.push('-');
            platform.push_str(release);
        }
    }
    platform
}

/// Whether `/proc/version` mentions Microsoft.
fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|version| version.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_memoizes_answers() {
        let probe = ToolProbe::new();
        let missing = "modgrade-definitely-not-a-tool";
        assert!(!probe.is_present(missing));
        assert_eq!(probe.cache.lock().unwrap().get(missing), Some(&false));
        assert!(!probe.is_present(missing));
    }

    #[test]
    fn snapshot_lists_every_known_tool() {
        let snapshot = EnvSnapshot::capture(&ToolProbe::new());
        assert_eq!(snapshot.tools.len(), KNOWN_TOOLS.len());
        assert!(snapshot.platform.starts_with(std::env::consts::OS));
        assert!(snapshot.runtime.starts_with("modgrade "));
    }
}
