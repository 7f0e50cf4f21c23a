//! Multi-chain model fitting.
//!
//! Chains are statistically independent given their distinct seeds and
//! starting points, so they run concurrently on the rayon pool. Pooling
//! keeps draws chain-major, and diagnostics run before the sample set is
//! handed out, while chain boundaries are still known.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::SamplerConfig;
use crate::error::Error;
use crate::posterior::SampleSet;
use crate::types::FitTag;

use super::diagnostics;
use super::gibbs::{self, ChainDraws};
use super::ModelSpec;

/// Fit the hierarchical model to one model specification.
///
/// Runs `config.chains` independent chains in parallel, pools their
/// retained draws, computes convergence diagnostics, and returns the
/// tagged sample set. Convergence problems become warnings on the sample
/// set; a chain that cannot complete fails the whole fit with
/// [`Error::Sampling`] (and only this fit — callers running a batch treat
/// each fit independently).
pub fn fit(spec: &ModelSpec, tag: FitTag, config: &SamplerConfig) -> Result<SampleSet, Error> {
    config.validate().map_err(Error::invalid)?;
    if spec.is_empty() {
        return Err(Error::invalid("model specification has no observations"));
    }
    if spec.question != tag.question {
        return Err(Error::invalid(format!(
            "tag '{}' does not match the specification's question ({})",
            tag, spec.question
        )));
    }

    let chain_results: Vec<Result<ChainDraws, String>> = (0..config.chains)
        .into_par_iter()
        .map(|chain_index| gibbs::run_chain(spec, config, chain_index))
        .collect();

    let mut chains = Vec::with_capacity(config.chains);
    for result in chain_results {
        match result {
            Ok(chain) => chains.push(chain),
            Err(reason) => return Err(Error::Sampling { tag, reason }),
        }
    }

    // Pool chain-major: chain 0's draws first for every parameter.
    let keys = spec.param_keys();
    let mut pooled: Vec<Vec<f64>> = vec![Vec::with_capacity(config.total_draws()); keys.len()];
    for chain in &chains {
        for (p, draws) in chain.draws.iter().enumerate() {
            pooled[p].extend_from_slice(draws);
        }
    }

    let (param_diagnostics, warnings) = diagnostics::evaluate(
        &keys,
        &pooled,
        config.chains,
        config.draws,
        &config.thresholds,
    );
    for warning in &warnings {
        warn!(fit = %tag, %warning, "convergence diagnostic outside threshold");
    }
    debug!(
        fit = %tag,
        parameters = keys.len(),
        draws = config.total_draws(),
        "fit complete"
    );

    Ok(SampleSet::from_parts(
        tag,
        keys,
        pooled,
        config.chains,
        config.draws,
        param_diagnostics,
        warnings,
    ))
}
