//! Command results and connection targets

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// A program invocation: executable, arguments and extra environment
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments, passed verbatim
    pub args: Vec<String>,
    /// Extra environment variables for the child only
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Create a spec for a program with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the child
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Credentials for a remote host, read from `USER` and `PASS`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Account name
    pub user: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials from explicit values
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Read `USER` and `PASS`, each defaulting to an empty string
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            user: std::env::var("USER").unwrap_or_default(),
            password: std::env::var("PASS").unwrap_or_default(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where management queries are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The machine this process runs on
    Local,
    /// Another machine, reached with explicit credentials
    Remote {
        /// Host name or address
        host: String,
        /// Credentials for the remote session
        credentials: Credentials,
    },
}

impl Target {
    /// Resolve a host name against the local node name and environment credentials
    #[must_use]
    pub fn resolve(host: &str) -> Self {
        Self::resolve_with(host, local_node_name().as_deref(), Credentials::from_env())
    }

    /// Resolve a host name with an explicit local node name and credentials
    #[must_use]
    pub fn resolve_with(host: &str, local_name: Option<&str>, credentials: Credentials) -> Self {
        let host = host.trim();
        let is_local = host.is_empty()
            || matches!(host, "localhost" | "127.0.0.1" | "::1" | ".")
            || local_name.is_some_and(|name| name.eq_ignore_ascii_case(host));

        if is_local {
            Target::Local
        } else {
            Target::Remote {
                host: host.to_string(),
                credentials,
            }
        }
    }

    /// Host name as reported in envelopes
    #[must_use]
    pub fn host(&self) -> String {
        match self {
            Target::Local => local_node_name().unwrap_or_else(|| "localhost".to_string()),
            Target::Remote { host, .. } => host.clone(),
        }
    }

    /// Check if this target is the local machine
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Target::Local)
    }
}

/// Name of the local node, if the OS reports one
#[must_use]
pub fn local_node_name() -> Option<String> {
    sysinfo::System::host_name()
}
