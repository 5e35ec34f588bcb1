//! `scan`

use super::Context;
use crate::config::ScanArgs;
use crate::error::Result;
use crate::io::read;
use crate::output::render_scan;
use crate::report::ScanReport;
use pakpatch_core::FieldPatcher;

/// List the device fields of a payload
pub async fn handle(args: ScanArgs, ctx: &Context) -> Result<()> {
    let payload = read(&args.payload).await?;
    let report = scan(&payload);
    println!("{}", render_scan(&report, ctx.format, ctx.style)?);
    Ok(())
}

/// Collect replaceable tokens and catalogue entries
pub fn scan(payload: &[u8]) -> ScanReport {
    ScanReport {
        payload_len: payload.len(),
        candidates: FieldPatcher::candidates(payload),
        device_ids: FieldPatcher::device_ids(payload),
    }
}
