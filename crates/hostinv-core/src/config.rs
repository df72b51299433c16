//! Settings for report persistence and probe orchestration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where and how reports are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Base directory; log paths are resolved against it
    pub project_dir: PathBuf,
    /// Log directory, relative to `project_dir` unless absolute
    pub log_path: PathBuf,
    /// Version string stamped into every envelope
    pub version: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            log_path: PathBuf::from("logs"),
            version: "0".to_string(),
        }
    }
}

impl ReportSettings {
    /// Directory the report files land in
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.project_dir.join(&self.log_path)
    }
}

/// How the orchestrator schedules its probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One probe after another, in list order
    Sequential,
    /// One task per probe, merged in completion order
    #[default]
    Concurrent,
}

/// Which probe list a full run covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Every probe in the catalogue
    #[default]
    System,
    /// Firmware, storage, memory, network and processor only
    Hardware,
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub mode: ExecutionMode,
    pub profile: Profile,
    /// Per-probe deadline in seconds; 0 disables it
    pub probe_timeout_secs: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            profile: Profile::default(),
            probe_timeout_secs: 300,
        }
    }
}

impl OrchestratorSettings {
    /// Per-probe deadline, if enabled
    #[must_use]
    pub fn probe_timeout(&self) -> Option<Duration> {
        (self.probe_timeout_secs > 0).then(|| Duration::from_secs(self.probe_timeout_secs))
    }
}
