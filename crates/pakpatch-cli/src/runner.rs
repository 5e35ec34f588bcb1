//! Bounded concurrent patch runs
//!
//! Each device gets its own run. Runs share the loaded archive and payload
//! read-only, patch on the blocking thread pool and write their own output
//! file; at most `jobs` runs are in flight at once.

use crate::device::DeviceName;
use crate::error::CliError;
use crate::io::{Inputs, output_path, write_output};
use crate::report::{FailureKind, RunReport};
use pakpatch_core::{PatchPipeline, PatchResult, SignatureKeyTable};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Runs patches for a list of devices
#[derive(Debug, Clone)]
pub struct BatchRunner {
    table: Arc<SignatureKeyTable>,
    out_dir: PathBuf,
    jobs: usize,
}

impl BatchRunner {
    /// Create a runner writing below `out_dir` with at most `jobs` runs at once
    pub fn new(table: Arc<SignatureKeyTable>, out_dir: PathBuf, jobs: usize) -> Self {
        Self {
            table,
            out_dir,
            jobs: jobs.max(1),
        }
    }

    /// Patch `inputs` once per device.
    ///
    /// Failures are reported per run and never abort other runs. Reports are
    /// returned in device order.
    pub async fn run(&self, inputs: &Inputs, devices: &[DeviceName]) -> Vec<RunReport> {
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = JoinSet::new();

        info!(runs = devices.len(), jobs = self.jobs, "starting runs");

        for (run_id, device) in devices.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let table = Arc::clone(&self.table);
            let inputs = inputs.clone();
            let output = output_path(&self.out_dir, &device, &inputs.pak_name);

            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring only waits
                let _permit = semaphore.acquire_owned().await;
                run_one(run_id, &device, table, inputs, output).await
            });
        }

        let mut reports = Vec::with_capacity(devices.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "run task failed"),
            }
        }

        // Any run lost to a panic still gets a report
        for (run_id, device) in devices.iter().enumerate() {
            if !reports.iter().any(|r| r.run_id == run_id) {
                reports.push(RunReport::failure(
                    run_id,
                    device.to_string(),
                    FailureKind::Internal,
                    "run task did not complete".to_string(),
                    0,
                ));
            }
        }

        reports.sort_by_key(|r| r.run_id);
        reports
    }
}

async fn run_one(
    run_id: usize,
    device: &DeviceName,
    table: Arc<SignatureKeyTable>,
    inputs: Inputs,
    output: PathBuf,
) -> RunReport {
    // Time spent waiting for a permit is not part of the run
    let started = Instant::now();
    let elapsed = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    debug!(run_id, %device, "run started");

    let value = device.to_string();
    let patched = tokio::task::spawn_blocking(move || -> Result<PatchResult, CliError> {
        let pipeline = PatchPipeline::with_table(&table);
        Ok(pipeline.patch(&inputs.container, &inputs.payload, &value)?)
    })
    .await
    .map_err(CliError::from)
    .and_then(|result| result);

    let result = match patched {
        Ok(result) => result,
        Err(e) => return failed(run_id, device, &e, elapsed()),
    };

    if let Err(e) = write_output(&output, &result.container).await {
        return failed(run_id, device, &e, elapsed());
    }

    info!(
        run_id,
        %device,
        old = %result.replacement.old_value,
        output = %output.display(),
        warnings = result.warnings.len(),
        "run completed"
    );
    RunReport::success(run_id, device.to_string(), &result, output, elapsed())
}

fn failed(run_id: usize, device: &DeviceName, error: &CliError, elapsed_ms: u64) -> RunReport {
    warn!(run_id, %device, %error, "run failed");
    let kind = match error {
        CliError::Patch(e) => FailureKind::Patch(e.kind()),
        CliError::Io { .. } => FailureKind::Io,
        _ => FailureKind::Internal,
    };
    RunReport::failure(run_id, device.to_string(), kind, error.to_string(), elapsed_ms)
}
