//! Terminal rendering of study reports.

use colored::Colorize;

use crate::compare::DifferenceSummary;
use crate::study::{ComparisonOutcome, FitOutcome, StudyReport};

/// Format a study report for human-readable terminal output.
///
/// Comparisons lead, since the study question is whether the reduction
/// shifted anything: a green check marks parameters whose 90% difference
/// interval spans zero, a yellow marker flags detectable shifts. Failed
/// fits and convergence warnings follow.
pub fn format_report(report: &StudyReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}\n",
        "Sampling-reduction comparison (full minus reduced)".bold()
    ));

    for comparison in &report.comparisons {
        match comparison {
            ComparisonOutcome::Compared {
                gas,
                question,
                differences,
            } => {
                out.push_str(&format!("\n{}\n", format!("{} — {}", gas, question).bold()));
                for diff in differences {
                    out.push_str(&format_difference(diff));
                }
            }
            ComparisonOutcome::Skipped {
                gas,
                question,
                reason,
            } => {
                out.push_str(&format!(
                    "\n{}\n  {}\n",
                    format!("{} — {}", gas, question).bold(),
                    format!("skipped: {}", reason).yellow()
                ));
            }
        }
    }

    let failed: Vec<&FitOutcome> = report
        .fits
        .iter()
        .filter(|f| f.posterior().is_none())
        .collect();
    if !failed.is_empty() {
        out.push_str(&format!("\n{}\n", "Failed fits".red().bold()));
        for outcome in failed {
            if let FitOutcome::Failed { tag, error } = outcome {
                out.push_str(&format!("  {}: {}\n", tag, error));
            }
        }
    }

    let warnings = report.warnings();
    if !warnings.is_empty() {
        out.push_str(&format!("\n{}\n", "Convergence warnings".yellow().bold()));
        for (tag, warning) in warnings {
            out.push_str(&format!("  {}: {}\n", tag, warning));
        }
    }

    out
}

fn format_difference(diff: &DifferenceSummary) -> String {
    let marker = if diff.spans_zero() {
        "\u{2713}".green().to_string()
    } else {
        "\u{26A0}".yellow().to_string()
    };
    format!(
        "  {} {:<18} median {:+.3}  50% [{:+.3}, {:+.3}]  90% [{:+.3}, {:+.3}]\n",
        marker,
        diff.key.to_string(),
        diff.median,
        diff.interval50.0,
        diff.interval50.1,
        diff.interval90.0,
        diff.interval90.1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerConfig;
    use crate::simulate::Synthetic;
    use crate::study::ReductionStudy;

    #[test]
    fn test_report_mentions_every_comparison() {
        let table = Synthetic {
            n_sites: 3,
            site_effects: vec![0.0; 3],
            ..Synthetic::default()
        }
        .table(3);
        let report = ReductionStudy::with_config(SamplerConfig::quick().warmup(100).draws(50))
            .run(&table)
            .unwrap();

        let text = format_report(&report);
        for gas in ["CO2", "CH4", "N2O"] {
            assert!(text.contains(gas), "missing {} section", gas);
        }
        assert!(text.contains("visit effects"));
        assert!(text.contains("site effects"));
        assert!(text.contains("median"));
    }
}
