//! `inspect`

use super::Context;
use crate::config::InspectArgs;
use crate::error::Result;
use crate::io::read;
use crate::output::render_inspect;
use crate::report::{InspectReport, PayloadLocation};
use pakpatch_core::{FeedbackCipher, PatchError, SegmentLocator, SignatureKeyTable};

/// Show the cipher layout of an archive
pub async fn handle(args: InspectArgs, ctx: &Context) -> Result<()> {
    let container = read(&args.pak).await?;
    let payload = match &args.payload {
        Some(path) => Some(read(path).await?),
        None => None,
    };

    let report = inspect(&ctx.table, &container, payload.as_deref())?;
    println!("{}", render_inspect(&report, ctx.format, ctx.style)?);
    Ok(())
}

/// List segments and, when `payload` is given, locate it
pub fn inspect(
    table: &SignatureKeyTable,
    container: &[u8],
    payload: Option<&[u8]>,
) -> Result<InspectReport> {
    let cipher = FeedbackCipher::new(table);

    let payload = match payload {
        Some(payload) => {
            let decoded = cipher.decode(container);
            Some(match SegmentLocator::new().locate(&decoded, payload) {
                Ok(located) => PayloadLocation::Found {
                    offset: located.offset,
                    len: located.compressed.len(),
                    config: located.config,
                },
                Err(PatchError::SegmentNotFound { configs_tried, .. }) => {
                    PayloadLocation::NotFound { configs_tried }
                }
                Err(e) => return Err(e.into()),
            })
        }
        None => None,
    };

    Ok(InspectReport {
        container_len: container.len(),
        segments: cipher.segments(container),
        payload,
    })
}
