//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber on stderr
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
/// Returns error if the level is not a valid filter or a subscriber is
/// already installed
pub fn init(config: &LoggingConfig) -> eyre::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| eyre::eyre!("failed to install logger: {e}"))
}
