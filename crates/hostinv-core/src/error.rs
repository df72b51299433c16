//! Core error types for hostinv-core

use std::path::PathBuf;
use std::time::Duration;

use hostinv_exec::ExecError;
use hostinv_inventory::InventoryError;
use thiserror::Error;

/// Errors that can occur while invoking, orchestrating or persisting probes
#[derive(Error, Debug)]
pub enum CoreError {
    /// The probe failed while gathering or normalizing data
    #[error("probe failed: {0}")]
    Probe(#[from] InventoryError),

    /// No management interface could be opened for the host
    #[error("failed to connect to {host}: {source}")]
    Connect {
        /// Target host
        host: String,
        /// Interface error
        source: ExecError,
    },

    /// The per-worker session could not be acquired
    #[error("session initialization failed: {0}")]
    Session(ExecError),

    /// The probe exceeded its deadline
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// A worker task panicked before reporting
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    /// The report could not be appended to its log file
    #[error("failed to persist report to {}: {source}", path.display())]
    Persist {
        /// Log file or directory being written
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The report could not be serialized
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Render an error and its source chain, one cause per line
#[must_use]
pub fn format_trace(error: &(dyn std::error::Error + 'static)) -> String {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\ncaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}
