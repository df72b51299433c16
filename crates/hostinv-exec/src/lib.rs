//! hostinv-exec: Host-management interface boundary
//!
//! Provides the management-interface trait consumed by inventory probes, the
//! scoped per-worker session guard, and a PowerShell/WMI implementation that
//! runs through a local command runner.

pub mod error;
pub mod local;
pub mod powershell;
pub mod query;
pub mod result;
pub mod session;
pub mod traits;

pub use error::ExecError;
pub use local::LocalRunner;
pub use powershell::{PowerShellFactory, PowerShellInterface};
pub use query::WqlQuery;
pub use result::{CommandResult, CommandSpec, Credentials, Target};
pub use session::SessionGuard;
pub use traits::{CommandRunner, Hive, InterfaceFactory, ManagementInterface};
