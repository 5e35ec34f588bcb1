//! Report rendering for the terminal
//!
//! Text output uses comfy-table; JSON output is pretty-printed serde_json.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::report::{InspectReport, PayloadLocation, RunReport, RunStatus, ScanReport};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::fmt::Write;

/// Style configuration for output formatting
#[derive(Debug, Clone, Copy)]
pub struct OutputStyle {
    /// Whether to use colors in output
    pub use_color: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_color: std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

impl OutputStyle {
    /// Style without colors
    pub const fn plain() -> Self {
        Self { use_color: false }
    }
}

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    table
}

fn header_cell(text: &str, style: OutputStyle) -> Cell {
    let cell = Cell::new(text).add_attribute(Attribute::Bold);
    if style.use_color {
        cell.fg(Color::Cyan)
    } else {
        cell
    }
}

fn numeric_cell(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn status_cell(status: &RunStatus, style: OutputStyle) -> Cell {
    let cell = Cell::new(status.label());
    if !style.use_color {
        return cell;
    }
    match status {
        RunStatus::Completed => cell.fg(Color::Green),
        RunStatus::Degraded => cell.fg(Color::Yellow),
        RunStatus::Failed { .. } => cell.fg(Color::Red),
    }
}

fn heading(title: &str, style: OutputStyle) -> String {
    if style.use_color {
        title.bold().bright_blue().to_string()
    } else {
        title.to_string()
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Render run reports
pub fn render_runs(reports: &[RunReport], format: OutputFormat, style: OutputStyle) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(reports);
    }

    let mut table = create_table();
    table.set_header(
        ["Device", "Status", "Replaced", "Config", "Offset", "Fit", "Output"]
            .map(|h| header_cell(h, style)),
    );
    for report in reports {
        table.add_row(vec![
            Cell::new(&report.device),
            status_cell(&report.status, style),
            Cell::new(or_dash(report.old_value.as_deref())),
            Cell::new(or_dash(report.config)),
            numeric_cell(or_dash(report.offset)),
            Cell::new(or_dash(report.adjustment)),
            Cell::new(or_dash(report.output.as_ref().map(|p| p.display()))),
        ]);
    }

    let mut out = table.to_string();
    for report in reports {
        for warning in &report.warnings {
            let line = format!("{}: {warning}", report.device);
            let _ = write!(out, "\n{}", paint_warning(&line, style));
        }
        if let RunStatus::Failed { message, .. } = &report.status {
            let line = format!("{}: {message}", report.device);
            let _ = write!(out, "\n{}", paint_error(&line, style));
        }
    }
    Ok(out)
}

/// Render the result of `scan`
pub fn render_scan(report: &ScanReport, format: OutputFormat, style: OutputStyle) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let mut table = create_table();
    table.set_header(["Offset", "Length", "Value"].map(|h| header_cell(h, style)));
    for candidate in &report.candidates {
        table.add_row(vec![
            numeric_cell(candidate.offset),
            numeric_cell(candidate.len()),
            Cell::new(&candidate.value),
        ]);
    }

    let mut out = format!(
        "{} ({} bytes, {} fields)\n{table}",
        heading("Device fields", style),
        report.payload_len,
        report.candidates.len()
    );
    if !report.device_ids.is_empty() {
        let _ = write!(
            out,
            "\n\n{}\n{}",
            heading("Catalogue", style),
            report.device_ids.join(", ")
        );
    }
    Ok(out)
}

/// Render the result of `inspect`
pub fn render_inspect(
    report: &InspectReport,
    format: OutputFormat,
    style: OutputStyle,
) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let mut table = create_table();
    table.set_header(["Offset", "Signature"].map(|h| header_cell(h, style)));
    for segment in &report.segments {
        table.add_row(vec![
            numeric_cell(segment.offset),
            Cell::new(segment.signature.to_string()),
        ]);
    }

    let mut out = format!(
        "{} ({} bytes, {} segments)\n{table}",
        heading("Segments", style),
        report.container_len,
        report.segments.len()
    );
    match &report.payload {
        Some(PayloadLocation::Found {
            offset,
            len,
            config,
        }) => {
            let _ = write!(
                out,
                "\n\n{}: {len} bytes at offset {offset} ({config})",
                heading("Payload", style)
            );
        }
        Some(PayloadLocation::NotFound { configs_tried }) => {
            let line = format!("not found after {configs_tried} configurations");
            let _ = write!(
                out,
                "\n\n{}: {}",
                heading("Payload", style),
                paint_error(&line, style)
            );
        }
        None => {}
    }
    Ok(out)
}

fn paint_warning(text: &str, style: OutputStyle) -> String {
    if style.use_color {
        text.yellow().to_string()
    } else {
        format!("warning: {text}")
    }
}

fn paint_error(text: &str, style: OutputStyle) -> String {
    if style.use_color {
        text.red().to_string()
    } else {
        format!("error: {text}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::FailureKind;
    use pakpatch_core::{ErrorKind, FieldCandidate};

    fn failed_report() -> RunReport {
        RunReport::failure(
            0,
            "RMX5011".to_string(),
            FailureKind::Patch(ErrorKind::NoCandidateField),
            "no replaceable device field found in payload".to_string(),
            1,
        )
    }

    #[test]
    fn test_runs_text() {
        let out = render_runs(&[failed_report()], OutputFormat::Text, OutputStyle::plain()).unwrap();

        assert!(out.contains("RMX5011"));
        assert!(out.contains("Failed"));
        assert!(out.contains("error: RMX5011: no replaceable device field"));
    }

    #[test]
    fn test_runs_json() {
        let out = render_runs(&[failed_report()], OutputFormat::Json, OutputStyle::plain()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(json[0]["device"], "RMX5011");
        assert_eq!(json[0]["status"], "failed");
    }

    #[test]
    fn test_scan_text() {
        let report = ScanReport {
            payload_len: 100,
            candidates: vec![FieldCandidate {
                offset: 12,
                value: "CPH2649".to_string(),
            }],
            device_ids: vec!["CPH2649".to_string(), "SM-X910".to_string()],
        };
        let out = render_scan(&report, OutputFormat::Text, OutputStyle::plain()).unwrap();

        assert!(out.starts_with("Device fields (100 bytes, 1 fields)"));
        assert!(out.contains("CPH2649, SM-X910"));
    }
}
