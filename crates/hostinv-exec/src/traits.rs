//! Runner and management-interface traits

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::query::WqlQuery;
use crate::result::{CommandResult, CommandSpec};

/// Runs a program to completion and captures its output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command without a deadline
    async fn run(&self, spec: &CommandSpec) -> Result<CommandResult, ExecError>;

    /// Run a command, failing with `ExecError::Timeout` once `timeout` elapses
    async fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short name for logs
    fn runner_type(&self) -> &'static str;
}

/// Top-level registry root selected by a hive constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl Hive {
    /// Numeric constant expected by the registry provider
    #[must_use]
    pub fn constant(self) -> u32 {
        match self {
            Hive::ClassesRoot => 2_147_483_648,
            Hive::CurrentUser => 2_147_483_649,
            Hive::LocalMachine => 2_147_483_650,
            Hive::Users => 2_147_483_651,
            Hive::CurrentConfig => 2_147_483_653,
        }
    }

    /// Short prefix used in registry paths (`HKLM`, ...)
    #[must_use]
    pub fn abbreviation(self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKCR",
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
            Hive::Users => "HKU",
            Hive::CurrentConfig => "HKCC",
        }
    }
}

/// Host-management query interface
///
/// Returns raw instance text for class queries and answers registry-style
/// enumerate/get calls. Implementations that need per-worker setup do it in
/// `initialize` and undo it in `uninitialize`; callers pair the two through
/// [`SessionGuard`](crate::session::SessionGuard).
#[async_trait]
pub trait ManagementInterface: Send + Sync {
    /// Run a class query, returning one instance-text block per object
    async fn query(&self, query: &WqlQuery) -> Result<Vec<String>, ExecError>;

    /// Enumerate the subkey names below `subkey`
    async fn enum_keys(&self, hive: Hive, subkey: &str) -> Result<Vec<String>, ExecError>;

    /// Enumerate the value names stored directly in `subkey`
    async fn enum_values(&self, hive: Hive, subkey: &str) -> Result<Vec<String>, ExecError>;

    /// Read one string value; `None` when it is absent or not a string
    async fn get_string_value(
        &self,
        hive: Hive,
        subkey: &str,
        value_name: &str,
    ) -> Result<Option<String>, ExecError>;

    /// Read several string values from one subkey, in `value_names` order
    async fn get_string_values(
        &self,
        hive: Hive,
        subkey: &str,
        value_names: &[String],
    ) -> Result<Vec<Option<String>>, ExecError> {
        let mut values = Vec::with_capacity(value_names.len());
        for name in value_names {
            values.push(self.get_string_value(hive, subkey, name).await?);
        }
        Ok(values)
    }

    /// Owning account of the first process with this image name
    async fn process_owner(&self, process_name: &str) -> Result<Option<String>, ExecError>;

    /// Owners for several process names, in `process_names` order
    async fn process_owners(
        &self,
        process_names: &[String],
    ) -> Result<Vec<Option<String>>, ExecError> {
        let mut owners = Vec::with_capacity(process_names.len());
        for name in process_names {
            owners.push(self.process_owner(name).await?);
        }
        Ok(owners)
    }

    /// Per-worker setup
    fn initialize(&self) -> Result<(), ExecError> {
        Ok(())
    }

    /// Per-worker teardown, called once for every successful `initialize`
    fn uninitialize(&self) {}

    /// Short name for logs
    fn interface_type(&self) -> &'static str;
}

/// Connects a management interface for a target host name
#[async_trait]
pub trait InterfaceFactory: Send + Sync {
    /// Open an interface for `host`
    async fn connect(&self, host: &str) -> Result<Arc<dyn ManagementInterface>, ExecError>;

    /// Check that the collaborator behind the interface is installed
    async fn is_available(&self) -> bool;
}
