//! Command handlers

pub mod inspect;
pub mod patch;
pub mod scan;

use crate::config::{Cli, OutputFormat};
use crate::output::OutputStyle;
use pakpatch_core::SignatureKeyTable;
use std::sync::Arc;

/// Context for command execution
#[derive(Debug, Clone)]
pub struct Context {
    /// Report format
    pub format: OutputFormat,
    /// Terminal styling
    pub style: OutputStyle,
    /// Builtin signatures plus any given with `--key`
    pub table: Arc<SignatureKeyTable>,
}

impl Context {
    /// Context from parsed arguments
    pub fn from_cli(cli: &Cli) -> Self {
        let style = if cli.no_color {
            OutputStyle::plain()
        } else {
            OutputStyle::default()
        };
        Self {
            format: cli.format,
            style,
            table: Arc::new(SignatureKeyTable::with_extra(
                cli.keys.iter().copied().map(Into::into),
            )),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            style: OutputStyle::plain(),
            table: Arc::new(SignatureKeyTable::default()),
        }
    }
}
