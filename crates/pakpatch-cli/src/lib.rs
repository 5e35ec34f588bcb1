//! Command-line front end for pakpatch
//!
//! This library provides the configuration, batch runner and report
//! rendering behind the `pakpatch` binary.

pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod io;
pub mod output;
pub mod report;
pub mod runner;

pub use commands::Context;
pub use config::{Cli, Commands, LogFormat, LogLevel, OutputFormat, RunConfig};
pub use device::DeviceName;
pub use error::{CliError, ConfigError, Result};
pub use report::{FailureKind, RunReport, RunStatus};
pub use runner::BatchRunner;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Logs go to stderr so stdout
/// carries only reports.
pub fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::from(level).as_str().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
