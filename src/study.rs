//! The reduction study: the full batch of fits and comparisons.
//!
//! 3 gases x 2 questions x 2 data scenarios = 12 independent fits, then
//! one full-vs-reduced comparison per (gas, question). Fits are isolated:
//! a sampling failure is recorded in that fit's slot and the batch
//! continues; a comparison whose inputs are unavailable is skipped with
//! the reason recorded.

use tracing::{info, warn};

use crate::compare::{compare, shared_keys, DifferenceSummary};
use crate::config::SamplerConfig;
use crate::data::ObservationTable;
use crate::design::design_matrix;
use crate::error::Error;
use crate::model::diagnostics::ConvergenceWarning;
use crate::model::fit;
use crate::posterior::SampleSet;
use crate::types::{FitTag, Gas, Question, Scenario};

/// Visits kept in the reduced scenario: first, middle, last.
pub const REDUCED_VISITS: [u8; 3] = [1, 3, 5];

/// Outcome of one fit in the batch.
#[derive(Debug)]
pub enum FitOutcome {
    /// The sampler completed; convergence warnings, if any, are on the
    /// sample set.
    Fitted(SampleSet),
    /// The fit aborted. Only this fit — the rest of the batch ran.
    Failed {
        /// The fit that failed.
        tag: FitTag,
        /// What went wrong.
        error: Error,
    },
}

impl FitOutcome {
    /// The fit this outcome belongs to.
    pub fn tag(&self) -> FitTag {
        match self {
            FitOutcome::Fitted(set) => set.tag(),
            FitOutcome::Failed { tag, .. } => *tag,
        }
    }

    /// The posterior, if the fit completed.
    pub fn posterior(&self) -> Option<&SampleSet> {
        match self {
            FitOutcome::Fitted(set) => Some(set),
            FitOutcome::Failed { .. } => None,
        }
    }
}

/// Outcome of one full-vs-reduced comparison.
#[derive(Debug)]
pub enum ComparisonOutcome {
    /// Differences (full minus reduced) for every parameter present in
    /// both posteriors.
    Compared {
        /// Gas of the compared fits.
        gas: Gas,
        /// Question of the compared fits.
        question: Question,
        /// Per-parameter difference summaries.
        differences: Vec<DifferenceSummary>,
    },
    /// The comparison could not run (a fit failed, or the sets were
    /// incompatible).
    Skipped {
        /// Gas of the would-be comparison.
        gas: Gas,
        /// Question of the would-be comparison.
        question: Question,
        /// Why it was skipped.
        reason: String,
    },
}

/// Everything one study run produced.
#[derive(Debug)]
pub struct StudyReport {
    /// All 12 fit outcomes, in (gas, question, scenario) order.
    pub fits: Vec<FitOutcome>,
    /// The 6 comparison outcomes, in (gas, question) order.
    pub comparisons: Vec<ComparisonOutcome>,
}

impl StudyReport {
    /// The posterior for one fit, if it completed.
    pub fn posterior(&self, tag: FitTag) -> Option<&SampleSet> {
        self.fits
            .iter()
            .find(|f| f.tag() == tag)
            .and_then(FitOutcome::posterior)
    }

    /// The comparison for one (gas, question) pair.
    pub fn comparison(&self, gas: Gas, question: Question) -> Option<&ComparisonOutcome> {
        self.comparisons.iter().find(|c| match c {
            ComparisonOutcome::Compared {
                gas: g,
                question: q,
                ..
            }
            | ComparisonOutcome::Skipped {
                gas: g,
                question: q,
                ..
            } => *g == gas && *q == question,
        })
    }

    /// All convergence warnings across the batch, with their fit tags.
    pub fn warnings(&self) -> Vec<(FitTag, &ConvergenceWarning)> {
        self.fits
            .iter()
            .filter_map(FitOutcome::posterior)
            .flat_map(|set| set.warnings().iter().map(move |w| (set.tag(), w)))
            .collect()
    }
}

/// Entry point for the whole analysis.
///
/// # Example
///
/// ```ignore
/// use revisit::{load_observations, ReductionStudy};
///
/// let table = load_observations(Path::new("observations.csv"))?;
/// let report = ReductionStudy::new().run(&table)?;
/// for comparison in &report.comparisons {
///     // intervals spanning zero mean the reduction lost nothing detectable
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReductionStudy {
    config: SamplerConfig,
}

impl ReductionStudy {
    /// Create a study with the default sampler configuration.
    pub fn new() -> Self {
        Self {
            config: SamplerConfig::default(),
        }
    }

    /// Create a study with a custom sampler configuration.
    pub fn with_config(config: SamplerConfig) -> Self {
        Self { config }
    }

    /// The sampler configuration used for every fit.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run all fits and comparisons on the given observation table.
    ///
    /// Returns an error only when the study cannot start at all (invalid
    /// configuration, or no observations survive the visit reduction);
    /// individual fit and comparison failures are recorded in the report.
    pub fn run(&self, table: &ObservationTable) -> Result<StudyReport, Error> {
        self.config.validate().map_err(Error::invalid)?;
        let reduced = table.reduced(&REDUCED_VISITS)?;

        let mut fits = Vec::with_capacity(12);
        for gas in Gas::ALL {
            for question in Question::ALL {
                for (scenario, data) in [(Scenario::Full, table), (Scenario::Reduced, &reduced)] {
                    let tag = FitTag::new(gas, question, scenario);
                    info!(fit = %tag, observations = data.len(), "fitting");
                    let result = design_matrix(data, gas, question)
                        .and_then(|spec| fit(&spec, tag, &self.config));
                    match result {
                        Ok(set) => fits.push(FitOutcome::Fitted(set)),
                        Err(error) => {
                            warn!(fit = %tag, %error, "fit failed; continuing batch");
                            fits.push(FitOutcome::Failed { tag, error });
                        }
                    }
                }
            }
        }

        let report = StudyReport {
            comparisons: self.run_comparisons(&fits),
            fits,
        };
        Ok(report)
    }

    fn run_comparisons(&self, fits: &[FitOutcome]) -> Vec<ComparisonOutcome> {
        let mut comparisons = Vec::with_capacity(6);
        for gas in Gas::ALL {
            for question in Question::ALL {
                let full = lookup(fits, FitTag::new(gas, question, Scenario::Full));
                let reduced = lookup(fits, FitTag::new(gas, question, Scenario::Reduced));
                let outcome = match (full, reduced) {
                    (Some(full), Some(reduced)) => {
                        match compare(full, reduced, &shared_keys(full, reduced)) {
                            Ok(differences) => ComparisonOutcome::Compared {
                                gas,
                                question,
                                differences,
                            },
                            Err(error) => ComparisonOutcome::Skipped {
                                gas,
                                question,
                                reason: error.to_string(),
                            },
                        }
                    }
                    _ => ComparisonOutcome::Skipped {
                        gas,
                        question,
                        reason: "one or both fits failed".to_string(),
                    },
                };
                comparisons.push(outcome);
            }
        }
        comparisons
    }
}

fn lookup(fits: &[FitOutcome], tag: FitTag) -> Option<&SampleSet> {
    fits.iter()
        .find(|f| f.tag() == tag)
        .and_then(FitOutcome::posterior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posterior::ParamKey;
    use crate::simulate::Synthetic;

    fn small_design() -> Synthetic {
        Synthetic {
            n_sites: 4,
            site_effects: vec![0.0; 4],
            ..Synthetic::default()
        }
    }

    fn quick_study() -> StudyReport {
        let table = small_design().table(2);
        ReductionStudy::with_config(SamplerConfig::quick().warmup(200).draws(100))
            .run(&table)
            .unwrap()
    }

    #[test]
    fn test_study_runs_all_fits_and_comparisons() {
        let report = quick_study();
        assert_eq!(report.fits.len(), 12);
        assert_eq!(report.comparisons.len(), 6);
        assert!(report.fits.iter().all(|f| f.posterior().is_some()));
    }

    #[test]
    fn test_by_visit_comparison_excludes_dropped_visits() {
        let report = quick_study();
        match report
            .comparison(Gas::Co2, Question::VisitEffects)
            .unwrap()
        {
            ComparisonOutcome::Compared { differences, .. } => {
                let keys: Vec<&ParamKey> = differences.iter().map(|d| &d.key).collect();
                assert!(keys.contains(&&ParamKey::Level("1".to_string())));
                assert!(keys.contains(&&ParamKey::Level("3".to_string())));
                assert!(!keys.contains(&&ParamKey::Level("2".to_string())));
                assert!(!keys.contains(&&ParamKey::Level("4".to_string())));
                assert!(!keys.iter().any(|k| matches!(
                    k,
                    ParamKey::Cell { level, .. } if level == "2" || level == "4"
                )));
            }
            other => panic!("expected Compared, got {:?}", other),
        }
    }

    #[test]
    fn test_by_site_comparison_keeps_every_site() {
        let report = quick_study();
        match report.comparison(Gas::N2o, Question::SiteEffects).unwrap() {
            ComparisonOutcome::Compared { differences, .. } => {
                let site_levels = differences
                    .iter()
                    .filter(|d| matches!(d.key, ParamKey::Level(_)))
                    .count();
                assert_eq!(site_levels, 4);
            }
            other => panic!("expected Compared, got {:?}", other),
        }
    }

    #[test]
    fn test_posterior_lookup_by_tag() {
        let report = quick_study();
        let tag = FitTag::new(Gas::Ch4, Question::VisitEffects, Scenario::Reduced);
        let set = report.posterior(tag).unwrap();
        assert_eq!(set.tag(), tag);
        // Reduced scenario only saw visits 1, 3, 5.
        assert!(!set.contains(&ParamKey::Level("2".to_string())));
    }
}
