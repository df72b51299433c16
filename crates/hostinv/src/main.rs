//! hostinv
//!
//! Collects host inventory over the Windows management interface and prints
//! the report as JSON

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use hostinv_core::{ExecutionMode, ProbeOrchestrator, ProbeRunner, ProbeTask, Profile};
use hostinv_exec::result::local_node_name;
use hostinv_exec::{InterfaceFactory, LocalRunner, PowerShellFactory};
use hostinv_inventory::{Probe, probes};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

mod config;
mod logging;

use config::{Config, LogFormat};

/// What a command asked to run
enum Selection {
    Profile(Profile, bool),
    Single(Arc<dyn Probe>),
}

#[derive(Parser)]
#[command(name = "hostinv", version)]
#[command(about = "Host inventory over the Windows management interface", long_about = None)]
struct Cli {
    /// Config file (defaults to $HOSTINV_CONFIG, ./hostinv.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target host; the local machine when omitted
    #[arg(long, global = true)]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the profile from the config file
    Run {
        /// Run probes one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Run every probe
    System {
        /// Run probes one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Run the hardware probes
    Hardware {
        /// Run probes one after another
        #[arg(long)]
        sequential: bool,
    },
    /// Run a single probe
    Probe {
        /// Probe name or capability name
        name: String,
    },
    /// List available probes
    Probes,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let (mut config, source) = Config::resolve(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    logging::init(&config.logging)?;

    match &source {
        Some(path) => debug!(path = %path.display(), "loaded config"),
        None => debug!("no config file found, using defaults"),
    }

    let selection = match cli.command {
        Commands::Probes => {
            for probe in probes::catalogue() {
                println!("{:<16}{}", probe.name(), probe.capability_name());
            }
            return Ok(());
        }
        Commands::Run { sequential } => Selection::Profile(config.orchestrator.profile, sequential),
        Commands::System { sequential } => Selection::Profile(Profile::System, sequential),
        Commands::Hardware { sequential } => Selection::Profile(Profile::Hardware, sequential),
        Commands::Probe { name } => Selection::Single(probes::find(&name)?),
    };

    let factory = Arc::new(PowerShellFactory::new(
        Arc::new(LocalRunner::new()),
        config.interface.shell.clone(),
        config.interface.command_timeout(),
    ));
    if !factory.is_available().await {
        eprintln!(
            "hostinv needs '{}' to reach the management interface.\n\
             Install PowerShell, or point [interface] shell in hostinv.toml at it.",
            config.interface.shell
        );
        std::process::exit(1);
    }

    let host = cli
        .host
        .or_else(local_node_name)
        .unwrap_or_else(|| "localhost".to_string());
    let runner = ProbeRunner::new(factory, config.report.clone())
        .with_timeout(config.orchestrator.probe_timeout());

    let body = match selection {
        Selection::Profile(profile, sequential) => {
            let mode = if sequential {
                ExecutionMode::Sequential
            } else {
                config.orchestrator.mode
            };
            info!(?profile, ?mode, host = %host, "running profile");
            ProbeOrchestrator::new(runner, profile.probes(), mode)
                .run(&host)
                .await
        }
        Selection::Single(probe) => {
            let task = ProbeTask::inline(probe);
            info!(probe = task.name(), host = %host, "running probe");
            runner.invoke(&task, &host, None).await
        }
    };

    println!("{}", to_pretty_json(&body)?);
    Ok(())
}

/// Serialize with four-space indentation
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use hostinv_core::{Outcome, ReturnBody};

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hostinv",
            "hardware",
            "--sequential",
            "--host",
            "WS01",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Hardware { sequential: true }));
        assert_eq!(cli.host.as_deref(), Some("WS01"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_probe_requires_name() {
        assert!(Cli::try_parse_from(["hostinv", "probe"]).is_err());
    }

    #[test]
    fn test_pretty_json_four_spaces() {
        let body = ReturnBody {
            outcome: Outcome::Successful,
            messages: Vec::new(),
            content: serde_json::Map::new(),
        };

        let json = to_pretty_json(&body).unwrap();

        assert_eq!(
            json,
            "{\n    \"outcome\": \"Successful\",\n    \"messages\": [],\n    \"content\": {}\n}"
        );
    }
}
