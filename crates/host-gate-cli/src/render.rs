// crates/host-gate-cli/src/render.rs
// ============================================================================
// Module: Report Rendering
// Description: Text and JSON renderings of a suite run report.
// Purpose: Produce the stdout payload for `host-gate run`.
// Dependencies: host-gate-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! The text rendering prints one verdict line per assertion in declaration
//! order, a bounded list of non-passing verdicts, and a localized summary
//! line. The JSON rendering emits the full report plus its summary as
//! canonical JSON so repeated runs over unchanged hosts are byte-identical.

// ============================================================================
// SECTION: Imports
// ============================================================================

use host_gate_core::OverallStatus;
use host_gate_core::Report;
use host_gate_core::ReportSummary;
use serde::Serialize;

use crate::t;

// ============================================================================
// SECTION: Types
// ============================================================================

/// JSON document written by `--format json`.
#[derive(Serialize)]
struct JsonReport<'a> {
    /// Full ordered report.
    report: &'a Report,
    /// Condensed summary.
    summary: ReportSummary,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Returns the localized label for a run status.
#[must_use]
pub fn status_label(status: OverallStatus) -> String {
    match status {
        OverallStatus::Pass => t!("report.status.pass"),
        OverallStatus::Fail => t!("report.status.fail"),
    }
}

/// Renders the text report, ending with a newline.
#[must_use]
pub fn render_text(report: &Report, max_failures: usize) -> String {
    let mut output = String::new();
    for verdict in &report.verdicts {
        output.push_str(&verdict.render_line());
        output.push('\n');
    }

    let summary = report.summary(max_failures);
    if !summary.failures.is_empty() || summary.omitted_failures > 0 {
        output.push('\n');
        output.push_str(&t!("report.failures.header"));
        output.push('\n');
        for verdict in &summary.failures {
            output.push_str("  ");
            output.push_str(&verdict.render_line());
            output.push('\n');
        }
        if summary.omitted_failures > 0 {
            output.push_str("  ");
            output.push_str(&t!("report.failures.omitted", count = summary.omitted_failures));
            output.push('\n');
        }
    }

    output.push('\n');
    output.push_str(&t!(
        "report.summary",
        status = status_label(summary.status),
        total = summary.counts.total,
        passed = summary.counts.passed,
        failed = summary.counts.failed,
        errored = summary.counts.errored
    ));
    output.push('\n');
    output
}

/// Renders the canonical JSON report, ending with a newline.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when the report cannot be serialized.
pub fn render_json(report: &Report, max_failures: usize) -> Result<Vec<u8>, serde_json::Error> {
    let document = JsonReport {
        report,
        summary: report.summary(max_failures),
    };
    let mut bytes = serde_jcs::to_vec(&document)?;
    bytes.push(b'\n');
    Ok(bytes)
}
