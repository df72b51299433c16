//! Error types for hostinv-exec

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the host-management interface and the processes behind it
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// The interface executable is not installed or not on `PATH`
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// Command ran but exited unsuccessfully
    #[error("command execution failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// Command timed out
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Per-worker session could not be initialized
    #[error("session error: {0}")]
    SessionError(String),

    /// Interface output could not be decoded
    #[error("malformed interface output: {0}")]
    MalformedOutput(String),
}
