//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use hostinv_core::{OrchestratorSettings, ReportSettings};
use hostinv_exec::powershell::DEFAULT_SHELL;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "HOSTINV_CONFIG";

/// Top-level configuration for hostinv
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Report persistence settings
    #[serde(default)]
    pub report: ReportSettings,
    /// Probe scheduling
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    /// Management interface process settings
    #[serde(default)]
    pub interface: InterfaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Management interface process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Shell executable hosting the interface
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Per-command timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl InterfaceConfig {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_command_timeout() -> u64 {
    120
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("failed to read {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("failed to parse {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, the environment, default paths, or defaults
    ///
    /// Returns the config together with the file it came from, if any.
    ///
    /// # Errors
    /// Returns error if the chosen file cannot be read or parsed
    pub fn resolve(explicit: Option<&Path>) -> eyre::Result<(Self, Option<PathBuf>)> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let candidates = [
            PathBuf::from("hostinv.toml"),
            dirs::config_dir()
                .map(|p| p.join("hostinv/hostinv.toml"))
                .unwrap_or_default(),
        ];
        Self::resolve_from(explicit, env, &candidates)
    }

    fn resolve_from(
        explicit: Option<&Path>,
        env: Option<PathBuf>,
        candidates: &[PathBuf],
    ) -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit.map(Path::to_path_buf).or(env) {
            return Ok((Self::load(&path)?, Some(path)));
        }

        for path in candidates {
            if !path.as_os_str().is_empty() && path.is_file() {
                return Ok((Self::load(path)?, Some(path.clone())));
            }
        }

        Ok((Config::default(), None))
    }
}
