//! JSON serialization of study summaries.

use crate::study::StudyReport;

use super::{summarize, StudySummary};

/// Serialize a study summary to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for
/// `StudySummary`).
pub fn to_json(summary: &StudySummary) -> Result<String, serde_json::Error> {
    serde_json::to_string(summary)
}

/// Serialize a study summary to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for
/// `StudySummary`).
pub fn to_json_pretty(summary: &StudySummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

/// Summarize a report and serialize it in one step.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn report_to_json(report: &StudyReport) -> Result<String, serde_json::Error> {
    to_json(&summarize(report))
}
