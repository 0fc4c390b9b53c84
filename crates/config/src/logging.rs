//! Logging configuration
//!
//! Compact terminal output plus an optional, always-debug file log.

use crate::Result;
use arbor_core::Error;
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 7] = [
    "arbor",
    "arbor_config",
    "arbor_core",
    "arbor_crypto",
    "arbor_db",
    "arbor_plugin",
    "arbor_tree",
];

/// Filter directives for all arbor crates at `level`
fn default_directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging and timestamps
/// * `log_file` - Optional path to append a detailed log to
///
/// `RUST_LOG` overrides the terminal filter.
///
/// # Examples
/// ```ignore
/// init(false, None)?;
/// init(true, Some(Path::new("arbor.log")))?;
/// ```
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let file_layer = match log_file {
        Some(log_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?;

            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty()
                    .with_filter(EnvFilter::new(default_directives("debug"))),
            )
        }
        None => None,
    };

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(true);

    let registry = tracing_subscriber::registry().with(file_layer);
    let installed = if verbose {
        registry.with(stdout_layer.with_filter(env_filter)).try_init()
    } else {
        // No timestamps in normal mode
        registry
            .with(stdout_layer.without_time().with_filter(env_filter))
            .try_init()
    };

    installed.map_err(|e| Error::Config(format!("Failed to initialize logging: {e}")))
}
