//! hostinv-core: probe invocation, reporting and orchestration
//!
//! Wraps every probe run in a report envelope that is persisted as one
//! JSON line, routes failures through a single handler, and merges many
//! probes into one aggregate report either sequentially or concurrently.

pub mod config;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod report;
pub mod task;

pub use config::{ExecutionMode, OrchestratorSettings, Profile, ReportSettings};
pub use error::{CoreError, format_trace};
pub use handler::handle_error;
pub use orchestrator::{Aggregate, ProbeOrchestrator, SYSTEM_CAPABILITY};
pub use report::{Outcome, ReportEnvelope, ReturnBody};
pub use task::{CompletionSender, ProbeOutcome, ProbeRunner, ProbeTask};
