//! End-to-end tests of the study pipeline on synthetic data.

use revisit::{
    compare, design_matrix, fit, shared_keys, simulate::Synthetic, ComparisonOutcome, FitTag,
    Gas, ParamKey, Question, ReductionStudy, SamplerConfig, Scenario, REDUCED_VISITS,
};

/// Moderate budget: enough draws for stable interval estimates while
/// keeping the full batch fast.
fn test_config() -> SamplerConfig {
    SamplerConfig::new().chains(4).warmup(1000).draws(500).seed(1)
}

#[test]
fn default_config_produces_exactly_4000_draws_per_parameter() {
    let table = Synthetic::default().table(11);
    let spec = design_matrix(&table, Gas::Co2, Question::SiteEffects).unwrap();
    let tag = FitTag::new(Gas::Co2, Question::SiteEffects, Scenario::Full);

    let set = fit(&spec, tag, &SamplerConfig::default()).unwrap();
    assert_eq!(set.n_chains(), 4);
    assert_eq!(set.n_draws_per_chain(), 1000);
    for key in set.keys() {
        assert_eq!(set.draws(key).unwrap().len(), 4000);
    }
}

#[test]
fn injected_site_effect_is_recovered() {
    // Site S05 sits 2 log units above every other site; everything else is
    // noise with sd 0.1.
    let table = Synthetic::default()
        .site_effect(4, 2.0)
        .noise_sd(0.1)
        .table(21);
    let spec = design_matrix(&table, Gas::Co2, Question::SiteEffects).unwrap();
    let tag = FitTag::new(Gas::Co2, Question::SiteEffects, Scenario::Full);
    let set = fit(&spec, tag, &test_config()).unwrap();

    // The likelihood pins down each site's *total* deviation (its level
    // plus the average of its two year cells); the split between the level
    // and the cells is a prior trade-off. The total contrast against a
    // null site should sit right at the injected effect.
    let total = |site: &str| -> Vec<f64> {
        let level = set.draws(&ParamKey::Level(site.to_string())).unwrap();
        let cell = |year: &str| {
            set.draws(&ParamKey::Cell {
                year: year.to_string(),
                level: site.to_string(),
            })
            .unwrap()
        };
        let (c22, c23) = (cell("2022"), cell("2023"));
        level
            .iter()
            .enumerate()
            .map(|(d, b)| b + (c22[d] + c23[d]) / 2.0)
            .collect()
    };
    let contrast: Vec<f64> = total("S05")
        .iter()
        .zip(total("S01"))
        .map(|(a, b)| a - b)
        .collect();
    let contrast_median = median(&contrast);
    assert!(
        (contrast_median - 2.0).abs() < 0.2,
        "total site contrast median {} should be near 2.0",
        contrast_median
    );

    // The site level itself absorbs most of the effect, and its 90%
    // credible interval should cover the truth.
    let summary = set.summary(&ParamKey::Level("S05".to_string())).unwrap();
    assert!(
        summary.median > 0.8,
        "site level median {} should clearly detect the effect",
        summary.median
    );
    assert!(
        summary.interval90.0 <= 2.0 && 2.0 <= summary.interval90.1,
        "90% interval [{:.3}, {:.3}] should contain the injected 2.0",
        summary.interval90.0,
        summary.interval90.1
    );
}

#[test]
fn null_reduction_shifts_almost_nothing() {
    // No true effects anywhere: dropping visits 2 and 4 should leave every
    // matched parameter's difference interval straddling zero, up to the
    // occasional near-miss.
    let table = Synthetic::default().table(31);
    let report = ReductionStudy::with_config(test_config())
        .run(&table)
        .unwrap();

    let mut total = 0usize;
    let mut spanning = 0usize;
    for comparison in &report.comparisons {
        match comparison {
            ComparisonOutcome::Compared { differences, .. } => {
                for diff in differences {
                    total += 1;
                    if diff.spans_zero() {
                        spanning += 1;
                    }
                }
            }
            ComparisonOutcome::Skipped { gas, question, reason } => {
                panic!("comparison {}/{} skipped: {}", gas, question, reason)
            }
        }
    }

    assert!(total > 0);
    let fraction = spanning as f64 / total as f64;
    assert!(
        fraction >= 0.85,
        "only {:.0}% of {} matched parameters straddle zero",
        fraction * 100.0,
        total
    );
}

#[test]
fn reduced_scenario_drops_the_right_visits() {
    let table = Synthetic::default().table(41);
    let reduced = table.reduced(&REDUCED_VISITS).unwrap();
    assert_eq!(reduced.visits(), vec![1, 3, 5]);
    assert_eq!(reduced.len(), 16 * 2 * 3);

    // A full-scenario visit cell absent from the reduced fit must be a
    // mismatch, not a silent pairing.
    let config = SamplerConfig::quick().warmup(200).draws(100).seed(2);
    let full_spec = design_matrix(&table, Gas::Ch4, Question::VisitEffects).unwrap();
    let reduced_spec = design_matrix(&reduced, Gas::Ch4, Question::VisitEffects).unwrap();
    let full_set = fit(
        &full_spec,
        FitTag::new(Gas::Ch4, Question::VisitEffects, Scenario::Full),
        &config,
    )
    .unwrap();
    let reduced_set = fit(
        &reduced_spec,
        FitTag::new(Gas::Ch4, Question::VisitEffects, Scenario::Reduced),
        &config,
    )
    .unwrap();

    let dropped_cell = ParamKey::Cell {
        year: "2023".to_string(),
        level: "2".to_string(),
    };
    assert!(full_set.contains(&dropped_cell));
    assert!(!reduced_set.contains(&dropped_cell));

    let err = compare(&full_set, &reduced_set, &[dropped_cell]).unwrap_err();
    assert!(matches!(err, revisit::Error::MismatchedParameter { .. }));

    // shared_keys excludes it, and the comparison then succeeds.
    let keys = shared_keys(&full_set, &reduced_set);
    assert!(keys
        .iter()
        .all(|k| !matches!(k, ParamKey::Level(l) if l == "2" || l == "4")));
    assert!(compare(&full_set, &reduced_set, &keys).is_ok());
}

#[test]
fn study_report_serializes_to_json() {
    let table = Synthetic {
        n_sites: 4,
        site_effects: vec![0.0; 4],
        ..Synthetic::default()
    }
    .table(51);
    let report = ReductionStudy::with_config(SamplerConfig::quick().warmup(200).draws(100))
        .run(&table)
        .unwrap();

    let json = revisit::output::json::report_to_json(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["fits"].as_array().unwrap().len(), 12);
    assert_eq!(value["comparisons"].as_array().unwrap().len(), 6);

    let text = revisit::output::terminal::format_report(&report);
    assert!(text.contains("site effects"));
}

fn median(xs: &[f64]) -> f64 {
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
