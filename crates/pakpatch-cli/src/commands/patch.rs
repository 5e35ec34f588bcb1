//! `patch` and `batch`

use super::Context;
use crate::config::{BatchArgs, PatchArgs, RunConfig};
use crate::error::{CliError, Result};
use crate::io::Inputs;
use crate::output::render_runs;
use crate::report::RunReport;
use crate::runner::BatchRunner;
use tracing::info;

/// Patch a single device
pub async fn handle_patch(args: PatchArgs, ctx: &Context) -> Result<()> {
    let config = RunConfig::from_patch(&args)?;
    report(&execute(&config, ctx).await?, ctx)
}

/// Patch every listed device
pub async fn handle_batch(args: BatchArgs, ctx: &Context) -> Result<()> {
    let config = RunConfig::from_batch(&args)?;
    report(&execute(&config, ctx).await?, ctx)
}

/// Validate `config`, load the inputs and run every device.
///
/// Per-run failures are part of the returned reports; only configuration
/// and input loading errors are returned as `Err`.
pub async fn execute(config: &RunConfig, ctx: &Context) -> Result<Vec<RunReport>> {
    config.validate()?;
    let inputs = Inputs::load(&config.pak, &config.payload).await?;
    info!(
        pak = %config.pak.display(),
        container_len = inputs.container.len(),
        payload_len = inputs.payload.len(),
        "loaded inputs"
    );

    let runner = BatchRunner::new(ctx.table.clone(), config.out_dir.clone(), config.jobs);
    Ok(runner.run(&inputs, &config.devices).await)
}

fn report(reports: &[RunReport], ctx: &Context) -> Result<()> {
    println!("{}", render_runs(reports, ctx.format, ctx.style)?);

    let failed = reports.iter().filter(|r| r.status.is_failed()).count();
    if failed > 0 {
        return Err(CliError::RunsFailed {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}
