//! Posterior comparison engine.
//!
//! Differences are computed draw-for-draw between parameters matched by
//! semantic key, never by position: the two scenarios can have different
//! numbers of visit levels and interaction cells, and positional
//! subtraction across differently shaped parameter vectors would corrupt
//! results silently. A requested key missing from either side is a hard
//! [`Error::MismatchedParameter`].

use serde::Serialize;

use crate::error::Error;
use crate::posterior::{ParamKey, SampleSet};
use crate::statistics;

/// Summary of the draw-wise difference of one matched parameter.
#[derive(Debug, Clone, Serialize)]
pub struct DifferenceSummary {
    /// The matched parameter.
    pub key: ParamKey,
    /// Median of the differences.
    pub median: f64,
    /// 50% interval (25th to 75th percentile) of the differences.
    pub interval50: (f64, f64),
    /// 90% interval (5th to 95th percentile) of the differences.
    pub interval90: (f64, f64),
}

impl DifferenceSummary {
    /// Whether both credible intervals span zero.
    ///
    /// This is the study's "negligible shift" reading: a parameter whose
    /// difference distribution is centered on zero lost no detectable
    /// information in the reduction.
    pub fn spans_zero(&self) -> bool {
        self.interval90.0 <= 0.0 && self.interval90.1 >= 0.0
    }
}

/// Parameter keys present in both sample sets, in `a`'s model order.
///
/// The usual input to [`compare`] when every matchable parameter should be
/// examined; cells observed in only one scenario are excluded here rather
/// than silently paired with something else.
pub fn shared_keys(a: &SampleSet, b: &SampleSet) -> Vec<ParamKey> {
    a.keys()
        .iter()
        .filter(|k| b.contains(k))
        .cloned()
        .collect()
}

/// Compute draw-wise difference summaries `a - b` for the requested keys.
///
/// Draw `k` of `b` is subtracted from draw `k` of `a` for every `k`, so
/// the result is anti-symmetric under swapping the arguments.
///
/// # Errors
/// [`Error::MismatchedParameter`] if a key is absent from either set, and
/// [`Error::InvalidInput`] if the two sets have different draw counts.
pub fn compare(
    a: &SampleSet,
    b: &SampleSet,
    keys: &[ParamKey],
) -> Result<Vec<DifferenceSummary>, Error> {
    if a.tag().question != b.tag().question {
        return Err(Error::invalid(format!(
            "cannot compare '{}' against '{}': different questions",
            a.tag(),
            b.tag()
        )));
    }
    if a.total_draws() != b.total_draws() {
        return Err(Error::invalid(format!(
            "sample sets have different draw counts: {} vs {}",
            a.total_draws(),
            b.total_draws()
        )));
    }

    let mut summaries = Vec::with_capacity(keys.len());
    for key in keys {
        let draws_a = a.draws(key).ok_or_else(|| Error::MismatchedParameter {
            key: key.clone(),
            missing_from: a.tag().scenario.to_string(),
        })?;
        let draws_b = b.draws(key).ok_or_else(|| Error::MismatchedParameter {
            key: key.clone(),
            missing_from: b.tag().scenario.to_string(),
        })?;

        let mut diffs: Vec<f64> = draws_a
            .iter()
            .zip(draws_b)
            .map(|(x, y)| x - y)
            .collect();
        diffs.sort_by(|x, y| x.total_cmp(y));

        summaries.push(DifferenceSummary {
            key: key.clone(),
            median: statistics::quantile_sorted(&diffs, 0.5),
            interval50: (
                statistics::quantile_sorted(&diffs, 0.25),
                statistics::quantile_sorted(&diffs, 0.75),
            ),
            interval90: (
                statistics::quantile_sorted(&diffs, 0.05),
                statistics::quantile_sorted(&diffs, 0.95),
            ),
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FitTag, Gas, Question, Scenario};

    fn set(scenario: Scenario, keys: Vec<ParamKey>, draws: Vec<Vec<f64>>) -> SampleSet {
        let n = draws.first().map_or(0, Vec::len);
        SampleSet::from_parts(
            FitTag::new(Gas::Co2, Question::VisitEffects, scenario),
            keys,
            draws,
            1,
            n,
            Vec::new(),
            Vec::new(),
        )
    }

    fn keys2() -> Vec<ParamKey> {
        vec![ParamKey::Intercept, ParamKey::Level("1".to_string())]
    }

    #[test]
    fn test_identical_sets_give_exact_zero() {
        let draws = vec![vec![1.0, 2.0, 3.0, 4.0], vec![-0.5, 0.5, 1.5, 2.5]];
        let a = set(Scenario::Full, keys2(), draws.clone());
        let b = set(Scenario::Reduced, keys2(), draws);

        let diffs = compare(&a, &b, &shared_keys(&a, &b)).unwrap();
        for diff in diffs {
            assert_eq!(diff.median, 0.0);
            assert_eq!(diff.interval50, (0.0, 0.0));
            assert_eq!(diff.interval90, (0.0, 0.0));
            assert!(diff.spans_zero());
        }
    }

    #[test]
    fn test_antisymmetry() {
        use approx::assert_abs_diff_eq;

        let a = set(
            Scenario::Full,
            keys2(),
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 1.0, 4.0, 9.0]],
        );
        let b = set(
            Scenario::Reduced,
            keys2(),
            vec![vec![0.5, 2.5, 2.0, 5.0], vec![1.0, 0.0, 2.0, 3.0]],
        );

        let ab = compare(&a, &b, &keys2()).unwrap();
        let ba = compare(&b, &a, &keys2()).unwrap();
        for (x, y) in ab.iter().zip(&ba) {
            assert_abs_diff_eq!(x.median, -y.median, epsilon = 1e-12);
            assert_abs_diff_eq!(x.interval90.0, -y.interval90.1, epsilon = 1e-12);
            assert_abs_diff_eq!(x.interval90.1, -y.interval90.0, epsilon = 1e-12);
            assert_abs_diff_eq!(x.interval50.0, -y.interval50.1, epsilon = 1e-12);
            assert_abs_diff_eq!(x.interval50.1, -y.interval50.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_missing_key_is_mismatched_parameter() {
        let full_keys = vec![
            ParamKey::Intercept,
            ParamKey::Cell {
                year: "2023".to_string(),
                level: "2".to_string(),
            },
        ];
        let a = set(
            Scenario::Full,
            full_keys.clone(),
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![0.1, 0.2, 0.3, 0.4]],
        );
        // Reduced scenario never observed visit 2, so its cell is absent.
        let b = set(
            Scenario::Reduced,
            vec![ParamKey::Intercept],
            vec![vec![1.0, 2.0, 3.0, 4.0]],
        );

        let err = compare(&a, &b, &full_keys).unwrap_err();
        match err {
            Error::MismatchedParameter { key, missing_from } => {
                assert_eq!(
                    key,
                    ParamKey::Cell {
                        year: "2023".to_string(),
                        level: "2".to_string(),
                    }
                );
                assert_eq!(missing_from, "reduced");
            }
            other => panic!("expected MismatchedParameter, got {}", other),
        }

        // Excluding the unmatched cell works.
        let diffs = compare(&a, &b, &shared_keys(&a, &b)).unwrap();
        assert_eq!(diffs.len(), 1);
    }

    #[test]
    fn test_different_questions_rejected() {
        let a = set(
            Scenario::Full,
            vec![ParamKey::Intercept],
            vec![vec![1.0, 2.0, 3.0, 4.0]],
        );
        let b = SampleSet::from_parts(
            FitTag::new(Gas::Co2, Question::SiteEffects, Scenario::Reduced),
            vec![ParamKey::Intercept],
            vec![vec![1.0, 2.0, 3.0, 4.0]],
            1,
            4,
            Vec::new(),
            Vec::new(),
        );
        assert!(matches!(
            compare(&a, &b, &[ParamKey::Intercept]),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_draw_count_mismatch_rejected() {
        let a = set(
            Scenario::Full,
            vec![ParamKey::Intercept],
            vec![vec![1.0, 2.0, 3.0, 4.0]],
        );
        let b = set(
            Scenario::Reduced,
            vec![ParamKey::Intercept],
            vec![vec![1.0, 2.0]],
        );
        assert!(matches!(
            compare(&a, &b, &[ParamKey::Intercept]),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_constant_shift_is_detected() {
        let a = set(
            Scenario::Full,
            vec![ParamKey::Intercept],
            vec![vec![2.0, 2.1, 2.2, 2.3]],
        );
        let b = set(
            Scenario::Reduced,
            vec![ParamKey::Intercept],
            vec![vec![1.0, 1.1, 1.2, 1.3]],
        );
        let diffs = compare(&a, &b, &[ParamKey::Intercept]).unwrap();
        assert_eq!(diffs[0].median, 1.0);
        assert!(!diffs[0].spans_zero());
    }
}
