//! Subscriber setup.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use washbay_core::config::LoggingConfig;

/// Build the level filter.
///
/// An explicit `--log-level` wins over `RUST_LOG`, which wins over the
/// configured level.
pub fn filter(config: &LoggingConfig, cli_level: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"));
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level '{}'", config.level)),
    }
}

/// Install the global subscriber, writing to `config.file` or stderr.
pub fn init(config: &LoggingConfig, cli_level: Option<&str>) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter(config, cli_level)?);

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
    installed.context("Failed to install log subscriber")
}
