//! pakpatch binary entry point.
//!
//! This is a thin wrapper around the pakpatch-cli library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Dispatches to the command handler
//!
//! For library usage, see the pakpatch-core crate documentation.

use anyhow::Result;
use clap::Parser;
use pakpatch_cli::commands::{self, Context};
use pakpatch_cli::{Cli, Commands, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    let ctx = Context::from_cli(&cli);
    if !cli.keys.is_empty() {
        tracing::debug!(entries = ctx.table.len(), "using extended signature table");
    }

    match cli.command {
        Commands::Patch(args) => commands::patch::handle_patch(args, &ctx).await?,
        Commands::Batch(args) => commands::patch::handle_batch(args, &ctx).await?,
        Commands::Scan(args) => commands::scan::handle(args, &ctx).await?,
        Commands::Inspect(args) => commands::inspect::handle(args, &ctx).await?,
    }

    Ok(())
}
