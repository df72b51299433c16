//! Management interface backed by PowerShell and WMI
//!
//! Class queries print each object's MOF text (`GetText('Mof')`), which is
//! the instance-text format the inventory parser consumes. Registry calls go
//! through the `StdRegProv` provider and come back as compact JSON.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::query::WqlQuery;
use crate::result::{CommandSpec, Target};
use crate::traits::{CommandRunner, Hive, InterfaceFactory, ManagementInterface};

/// Line printed between two instance-text blocks
const RECORD_SEPARATOR: &str = "--hostinv-record--";

/// Environment variables carrying remote credentials into the child
const USER_VAR: &str = "HOSTINV_USER";
const PASS_VAR: &str = "HOSTINV_PASS";

/// Default executable
pub const DEFAULT_SHELL: &str = "powershell";

/// PowerShell-backed management interface for one target host
pub struct PowerShellInterface {
    runner: Arc<dyn CommandRunner>,
    shell: String,
    target: Target,
    timeout: Duration,
    active_sessions: AtomicUsize,
}

impl PowerShellInterface {
    /// Create an interface for a target
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        shell: impl Into<String>,
        target: Target,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            shell: shell.into(),
            target,
            timeout,
            active_sessions: AtomicUsize::new(0),
        }
    }

    /// Number of sessions currently held by workers
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    /// Common script header: strict errors plus connection parameters
    fn preamble(&self) -> String {
        let mut script = String::from("$ErrorActionPreference = 'Stop'\n$params = @{}\n");

        if let Target::Remote { host, credentials } = &self.target {
            script.push_str(&format!("$params.ComputerName = {}\n", ps_quote(host)));
            if !credentials.user.is_empty() {
                script.push_str(&format!(
                    "$secure = ConvertTo-SecureString $env:{PASS_VAR} -AsPlainText -Force\n"
                ));
                script.push_str(&format!(
                    "$params.Credential = New-Object System.Management.Automation.PSCredential($env:{USER_VAR}, $secure)\n"
                ));
            }
        }

        script
    }

    /// Build the process invocation for a script body
    fn command_spec(&self, body: &str) -> CommandSpec {
        let script = format!("{}{body}", self.preamble());

        let mut spec = CommandSpec::new(&self.shell)
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-EncodedCommand")
            .arg(encode_command(&script));

        if let Target::Remote { credentials, .. } = &self.target {
            spec = spec
                .env(USER_VAR, &credentials.user)
                .env(PASS_VAR, &credentials.password);
        }

        spec
    }

    async fn run_script(&self, body: &str) -> Result<String, ExecError> {
        let spec = self.command_spec(body);
        let result = self.runner.run_with_timeout(&spec, self.timeout).await?;

        if !result.success() {
            return Err(ExecError::CommandFailed {
                status: result.status,
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result.stdout)
    }

    fn registry_provider() -> &'static str {
        "$reg = Get-WmiObject -Namespace 'root\\default' -List @params | Where-Object { $_.Name -eq 'StdRegProv' }\n"
    }
}

#[async_trait]
impl ManagementInterface for PowerShellInterface {
    #[instrument(skip(self), fields(wql = %query))]
    async fn query(&self, query: &WqlQuery) -> Result<Vec<String>, ExecError> {
        let body = format!(
            "Get-WmiObject -Query {} @params | ForEach-Object {{ $_.GetText('Mof'); '{RECORD_SEPARATOR}' }}\n",
            ps_quote(&query.build())
        );
        let stdout = self.run_script(&body).await?;
        let records = split_records(&stdout);

        debug!(records = records.len(), "class query completed");

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn enum_keys(&self, hive: Hive, subkey: &str) -> Result<Vec<String>, ExecError> {
        let body = format!(
            "{}$r = $reg.EnumKey([uint32]{}, {})\nif ($r.sNames) {{ ConvertTo-Json -Compress -InputObject @($r.sNames) }} else {{ '[]' }}\n",
            Self::registry_provider(),
            hive.constant(),
            ps_quote(subkey)
        );
        parse_json_list(&self.run_script(&body).await?)
    }

    #[instrument(skip(self))]
    async fn enum_values(&self, hive: Hive, subkey: &str) -> Result<Vec<String>, ExecError> {
        let body = format!(
            "{}$r = $reg.EnumValues([uint32]{}, {})\nif ($r.sNames) {{ ConvertTo-Json -Compress -InputObject @($r.sNames) }} else {{ '[]' }}\n",
            Self::registry_provider(),
            hive.constant(),
            ps_quote(subkey)
        );
        parse_json_list(&self.run_script(&body).await?)
    }

    #[instrument(skip(self))]
    async fn get_string_value(
        &self,
        hive: Hive,
        subkey: &str,
        value_name: &str,
    ) -> Result<Option<String>, ExecError> {
        let body = format!(
            "{}$r = $reg.GetStringValue([uint32]{}, {}, {})\nif ($r.ReturnValue -eq 0) {{ ConvertTo-Json -Compress -InputObject $r.sValue }} else {{ 'null' }}\n",
            Self::registry_provider(),
            hive.constant(),
            ps_quote(subkey),
            ps_quote(value_name)
        );
        parse_json_optional(&self.run_script(&body).await?)
    }

    #[instrument(skip(self, value_names), fields(count = value_names.len()))]
    async fn get_string_values(
        &self,
        hive: Hive,
        subkey: &str,
        value_names: &[String],
    ) -> Result<Vec<Option<String>>, ExecError> {
        if value_names.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = value_names.iter().map(|n| ps_quote(n)).collect();
        let body = format!(
            "{}$out = @()\nforeach ($n in @({})) {{ $r = $reg.GetStringValue([uint32]{}, {}, $n); if ($r.ReturnValue -eq 0) {{ $out += ,$r.sValue }} else {{ $out += ,$null }} }}\nConvertTo-Json -Compress -InputObject $out\n",
            Self::registry_provider(),
            names.join(", "),
            hive.constant(),
            ps_quote(subkey)
        );

        let stdout = self.run_script(&body).await?;
        let values: Vec<Option<String>> = serde_json::from_str(stdout.trim())
            .map_err(|e| ExecError::MalformedOutput(e.to_string()))?;

        if values.len() != value_names.len() {
            return Err(ExecError::MalformedOutput(format!(
                "expected {} values, got {}",
                value_names.len(),
                values.len()
            )));
        }

        Ok(values)
    }

    #[instrument(skip(self, process_names), fields(count = process_names.len()))]
    async fn process_owners(
        &self,
        process_names: &[String],
    ) -> Result<Vec<Option<String>>, ExecError> {
        #[derive(serde::Deserialize)]
        struct OwnerRow {
            #[serde(rename = "Name")]
            name: String,
            #[serde(rename = "User")]
            user: Option<String>,
        }

        if process_names.is_empty() {
            return Ok(Vec::new());
        }

        let body = "$rows = @(Get-WmiObject -Class Win32_Process @params | ForEach-Object { [pscustomobject]@{ Name = $_.Name; User = $_.GetOwner().User } })\nConvertTo-Json -Compress -InputObject $rows\n";
        let stdout = self.run_script(body).await?;
        let rows: Vec<OwnerRow> = serde_json::from_str(stdout.trim())
            .map_err(|e| ExecError::MalformedOutput(e.to_string()))?;

        Ok(process_names
            .iter()
            .map(|wanted| {
                rows.iter()
                    .find(|row| row.name.eq_ignore_ascii_case(wanted))
                    .and_then(|row| row.user.clone())
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn process_owner(&self, process_name: &str) -> Result<Option<String>, ExecError> {
        let query = WqlQuery::new("Win32_Process").where_eq("Name", process_name);
        let body = format!(
            "$p = Get-WmiObject -Query {} @params | Select-Object -First 1\nif ($p) {{ ConvertTo-Json -Compress -InputObject $p.GetOwner().User }} else {{ 'null' }}\n",
            ps_quote(&query.build())
        );
        parse_json_optional(&self.run_script(&body).await?)
    }

    fn initialize(&self) -> Result<(), ExecError> {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninitialize(&self) {
        if self
            .active_sessions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            warn!("uninitialize without matching initialize");
        }
    }

    fn interface_type(&self) -> &'static str {
        "powershell"
    }
}

/// Creates [`PowerShellInterface`]s for host names
pub struct PowerShellFactory {
    runner: Arc<dyn CommandRunner>,
    shell: String,
    timeout: Duration,
}

impl PowerShellFactory {
    /// Create a factory using `shell` as the executable
    pub fn new(runner: Arc<dyn CommandRunner>, shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            shell: shell.into(),
            timeout,
        }
    }
}

#[async_trait]
impl InterfaceFactory for PowerShellFactory {
    async fn connect(&self, host: &str) -> Result<Arc<dyn ManagementInterface>, ExecError> {
        let target = Target::resolve(host);
        debug!(host, local = target.is_local(), "connecting management interface");
        Ok(Arc::new(PowerShellInterface::new(
            self.runner.clone(),
            &self.shell,
            target,
            self.timeout,
        )))
    }

    async fn is_available(&self) -> bool {
        let spec = CommandSpec::new(&self.shell)
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg("exit 0");
        self.runner
            .run_with_timeout(&spec, self.timeout)
            .await
            .map(|r| r.success())
            .unwrap_or(false)
    }
}

/// Single-quoted PowerShell string literal
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `-EncodedCommand` takes base64 of the UTF-16LE script
fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    STANDARD.encode(bytes)
}

fn split_records(stdout: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();

    for line in stdout.lines() {
        if line.trim() == RECORD_SEPARATOR {
            let record = current.trim();
            if !record.is_empty() {
                records.push(record.to_string());
            }
            current.clear();
        } else {
            current.push_str(line.trim_end_matches('\r'));
            current.push('\n');
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        records.push(tail.to_string());
    }

    records
}

fn parse_json_list(stdout: &str) -> Result<Vec<String>, ExecError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| ExecError::MalformedOutput(e.to_string()))
}

fn parse_json_optional(stdout: &str) -> Result<Option<String>, ExecError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map_err(|e| ExecError::MalformedOutput(e.to_string()))
}
