//! Report views for the external reporting layer.
//!
//! The reporting layer only reads study outputs, so this module exposes a
//! flattened, serializable summary view of a [`StudyReport`] plus terminal
//! and JSON renderers. Raw draws stay inside the library; summaries carry
//! everything downstream plots need (medians, intervals, diagnostics,
//! warnings), each taggable by (gas, question, scenario).

pub mod json;
pub mod terminal;

use serde::Serialize;

use crate::compare::DifferenceSummary;
use crate::model::diagnostics::{ConvergenceWarning, ParamDiagnostics};
use crate::posterior::ParamSummary;
use crate::study::{ComparisonOutcome, FitOutcome, StudyReport};
use crate::types::{FitTag, Gas, Question};

/// Serializable summary of a whole study run.
#[derive(Debug, Serialize)]
pub struct StudySummary {
    /// One entry per fit, in batch order.
    pub fits: Vec<FitSummary>,
    /// One entry per (gas, question) comparison.
    pub comparisons: Vec<ComparisonSummary>,
}

/// Serializable summary of one fit.
#[derive(Debug, Serialize)]
pub struct FitSummary {
    /// Which fit this is.
    pub tag: FitTag,
    /// Error message if the fit failed; `None` if it completed.
    pub error: Option<String>,
    /// Posterior summaries per parameter (empty for failed fits).
    pub parameters: Vec<ParamSummary>,
    /// Convergence diagnostics per parameter (empty for failed fits).
    pub diagnostics: Vec<ParamDiagnostics>,
    /// Convergence warnings (empty for failed fits).
    pub warnings: Vec<ConvergenceWarning>,
}

/// Serializable summary of one comparison.
#[derive(Debug, Serialize)]
pub struct ComparisonSummary {
    /// Gas of the compared fits.
    pub gas: Gas,
    /// Question of the compared fits.
    pub question: Question,
    /// Why the comparison was skipped; `None` if it ran.
    pub skipped: Option<String>,
    /// Per-parameter difference summaries (full minus reduced).
    pub differences: Vec<DifferenceSummary>,
}

/// Build the summary view of a study report.
pub fn summarize(report: &StudyReport) -> StudySummary {
    let fits = report
        .fits
        .iter()
        .map(|outcome| match outcome {
            FitOutcome::Fitted(set) => FitSummary {
                tag: set.tag(),
                error: None,
                parameters: set.summaries(),
                diagnostics: set.diagnostics().to_vec(),
                warnings: set.warnings().to_vec(),
            },
            FitOutcome::Failed { tag, error } => FitSummary {
                tag: *tag,
                error: Some(error.to_string()),
                parameters: Vec::new(),
                diagnostics: Vec::new(),
                warnings: Vec::new(),
            },
        })
        .collect();

    let comparisons = report
        .comparisons
        .iter()
        .map(|outcome| match outcome {
            ComparisonOutcome::Compared {
                gas,
                question,
                differences,
            } => ComparisonSummary {
                gas: *gas,
                question: *question,
                skipped: None,
                differences: differences.clone(),
            },
            ComparisonOutcome::Skipped {
                gas,
                question,
                reason,
            } => ComparisonSummary {
                gas: *gas,
                question: *question,
                skipped: Some(reason.clone()),
                differences: Vec::new(),
            },
        })
        .collect();

    StudySummary { fits, comparisons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerConfig;
    use crate::simulate::Synthetic;
    use crate::study::ReductionStudy;

    #[test]
    fn test_summary_mirrors_report_shape() {
        let table = Synthetic {
            n_sites: 3,
            site_effects: vec![0.0; 3],
            ..Synthetic::default()
        }
        .table(6);
        let report = ReductionStudy::with_config(SamplerConfig::quick().warmup(100).draws(50))
            .run(&table)
            .unwrap();

        let summary = summarize(&report);
        assert_eq!(summary.fits.len(), report.fits.len());
        assert_eq!(summary.comparisons.len(), report.comparisons.len());
        assert!(summary.fits.iter().all(|f| f.error.is_none()));
        assert!(summary
            .fits
            .iter()
            .all(|f| f.parameters.len() == f.diagnostics.len()));
    }
}
