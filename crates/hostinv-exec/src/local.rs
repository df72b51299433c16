//! Local process execution using `tokio::process`

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::{CommandResult, CommandSpec};
use crate::traits::CommandRunner;

/// Local command runner
///
/// Spawns programs directly (no intermediate shell), so arguments reach the
/// child verbatim.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

impl LocalRunner {
    /// Create a new local runner
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, spec), fields(program = %spec.program), level = "debug")]
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!(args = spec.args.len(), "spawning local process");

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExecError::ToolNotFound(spec.program.clone()),
                _ => ExecError::SpawnError(e.to_string()),
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();
        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(status, duration = ?duration, "process completed");

        if !output.status.success() {
            error!(status, stderr = %stderr.trim(), "process failed");
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ExecError> {
        self.execute(spec).await
    }

    async fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        match timeout(timeout_duration, self.execute(spec)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    program = %spec.program,
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "process timed out"
                );
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    fn runner_type(&self) -> &'static str {
        "local"
    }
}
