//! Command-line configuration.
//!
//! Every option can also be given through a `PAKPATCH_*` environment
//! variable. Arguments are parsed with clap and turned into a [`RunConfig`],
//! which is validated before any file is read.
//!
//! # Example
//!
//! ```
//! use clap::Parser;
//! use pakpatch_cli::config::{Cli, Commands};
//!
//! let cli = Cli::try_parse_from([
//!     "pakpatch", "batch",
//!     "--pak", "game.pak",
//!     "--payload", "DeviceProfiles.bin",
//!     "--devices", "RMX5011,SM-X910",
//!     "--jobs", "2",
//! ])
//! .expect("valid arguments");
//!
//! assert!(matches!(cli.command, Commands::Batch(_)));
//! ```

use crate::device::DeviceName;
use crate::error::ConfigError;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pakpatch_core::TableEntry;
use std::path::PathBuf;
use tracing::{Level, warn};

/// Top-level arguments
#[derive(Debug, Parser)]
#[command(
    name = "pakpatch",
    about = "Rewrite the device model field inside obfuscated game archives",
    version
)]
pub struct Cli {
    /// Log verbosity (overridden by RUST_LOG)
    #[arg(
        long,
        value_enum,
        env = "PAKPATCH_LOG_LEVEL",
        default_value = "info",
        global = true
    )]
    pub log_level: LogLevel,

    /// Log line format
    #[arg(
        long,
        value_enum,
        env = "PAKPATCH_LOG_FORMAT",
        default_value = "text",
        global = true
    )]
    pub log_format: LogFormat,

    /// Report format on stdout
    #[arg(
        short = 'o',
        long,
        value_enum,
        env = "PAKPATCH_OUTPUT",
        default_value = "text",
        global = true
    )]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Extra segment signature and key, in hex (repeatable)
    #[arg(long = "key", value_name = "SIG=KEY", global = true)]
    pub keys: Vec<TableEntry>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Patch one device name into the archive
    Patch(PatchArgs),

    /// Patch several device names, one output archive each
    Batch(BatchArgs),

    /// List device fields found in a payload
    Scan(ScanArgs),

    /// Show cipher segments of an archive and locate a payload in it
    Inspect(InspectArgs),
}

/// Inputs shared by `patch` and `batch`
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Encoded archive to patch
    #[arg(long, env = "PAKPATCH_PAK")]
    pub pak: PathBuf,

    /// Plaintext of the embedded payload as shipped
    #[arg(long, env = "PAKPATCH_PAYLOAD")]
    pub payload: PathBuf,

    /// Directory receiving `<DEVICE>/<archive name>`
    #[arg(long, env = "PAKPATCH_OUT_DIR", default_value = "out")]
    pub out_dir: PathBuf,
}

/// Arguments of `patch`
#[derive(Debug, Clone, Args)]
pub struct PatchArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Device model name to write (5 to 20 characters)
    #[arg(short, long)]
    pub device: String,
}

/// Arguments of `batch`
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Device model names, comma separated or repeated
    #[arg(long, value_delimiter = ',', required = true, num_args = 1..)]
    pub devices: Vec<String>,

    /// Concurrent runs (defaults to available parallelism)
    #[arg(short, long, env = "PAKPATCH_JOBS")]
    pub jobs: Option<usize>,
}

/// Arguments of `scan`
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Plaintext payload to scan
    #[arg(long, env = "PAKPATCH_PAYLOAD")]
    pub payload: PathBuf,
}

/// Arguments of `inspect`
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Encoded archive
    #[arg(long, env = "PAKPATCH_PAK")]
    pub pak: PathBuf,

    /// Payload to locate in the decoded archive
    #[arg(long)]
    pub payload: Option<PathBuf>,
}

/// Log verbosity
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Log line format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Report format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tables and plain text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Validated settings for `patch` and `batch`
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Encoded archive
    pub pak: PathBuf,
    /// Plaintext payload
    pub payload: PathBuf,
    /// Output root
    pub out_dir: PathBuf,
    /// Devices to produce, in order, without duplicates
    pub devices: Vec<DeviceName>,
    /// Concurrent runs
    pub jobs: usize,
}

impl RunConfig {
    /// Settings for a single `patch` run
    pub fn from_patch(args: &PatchArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            pak: args.inputs.pak.clone(),
            payload: args.inputs.payload.clone(),
            out_dir: args.inputs.out_dir.clone(),
            devices: vec![args.device.parse()?],
            jobs: 1,
        })
    }

    /// Settings for a `batch`; repeated device names are dropped
    pub fn from_batch(args: &BatchArgs) -> Result<Self, ConfigError> {
        let mut devices: Vec<DeviceName> = Vec::with_capacity(args.devices.len());
        for raw in &args.devices {
            let device: DeviceName = raw.parse()?;
            if devices.contains(&device) {
                warn!(%device, "duplicate device name ignored");
                continue;
            }
            devices.push(device);
        }

        let jobs = args.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        });

        Ok(Self {
            pak: args.inputs.pak.clone(),
            payload: args.inputs.payload.clone(),
            out_dir: args.inputs.out_dir.clone(),
            devices,
            jobs,
        })
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The archive or payload file doesn't exist
    /// - `jobs` is zero
    /// - No device names remain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pak.is_file() {
            return Err(ConfigError::MissingInput {
                what: "pak",
                path: self.pak.clone(),
            });
        }
        if !self.payload.is_file() {
            return Err(ConfigError::MissingInput {
                what: "payload",
                path: self.payload.clone(),
            });
        }
        if self.jobs == 0 {
            return Err(ConfigError::InvalidJobs);
        }
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        Ok(())
    }
}
