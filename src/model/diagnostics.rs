//! Convergence diagnostics: rank-normalized split R-hat and bulk ESS.
//!
//! Both follow the Stan reference implementations: chains are split in
//! half (dropping the middle draw when the length is odd), draws are
//! rank-normalized across the pooled sample before either statistic is
//! computed, and the effective sample size uses Geyer's initial monotone
//! sequence over paired autocorrelations.
//!
//! Diagnostics run while per-chain boundaries are still known, before the
//! draws are handed out as one pooled collection. A diagnostic outside its
//! threshold produces a [`ConvergenceWarning`] attached to the sample set;
//! it never fails the fit.

use serde::Serialize;

use crate::config::DiagnosticThresholds;
use crate::posterior::ParamKey;
use crate::statistics::{autocovariance, mean, normal_scores, sample_variance};

/// Per-parameter convergence diagnostics.
///
/// `None` means the statistic was not estimable (too few draws, or a
/// degenerate constant chain).
#[derive(Debug, Clone, Serialize)]
pub struct ParamDiagnostics {
    /// The parameter.
    pub key: ParamKey,
    /// Rank-normalized split R-hat.
    pub rhat: Option<f64>,
    /// Bulk effective sample size.
    pub ess: Option<f64>,
}

/// A convergence diagnostic outside its threshold.
///
/// Attached to the sample set and surfaced in reporting; the posterior
/// draws are still returned, flagged as potentially unreliable.
#[derive(Debug, Clone, Serialize)]
pub enum ConvergenceWarning {
    /// Split R-hat above the configured maximum.
    HighRhat {
        /// The parameter.
        key: ParamKey,
        /// Observed rank-normalized split R-hat.
        rhat: f64,
    },
    /// Bulk effective sample size below the configured minimum.
    LowEss {
        /// The parameter.
        key: ParamKey,
        /// Observed bulk effective sample size.
        ess: f64,
    },
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvergenceWarning::HighRhat { key, rhat } => {
                write!(f, "{}: split R-hat {:.3} indicates poor mixing", key, rhat)
            }
            ConvergenceWarning::LowEss { key, ess } => {
                write!(f, "{}: effective sample size {:.0} is too small", key, ess)
            }
        }
    }
}

/// Compute diagnostics for every parameter and collect threshold
/// violations.
///
/// `draws` is laid out `[parameter][chain-major draws]` with `n_chains`
/// chains of `n_draws` each.
pub(crate) fn evaluate(
    keys: &[ParamKey],
    draws: &[Vec<f64>],
    n_chains: usize,
    n_draws: usize,
    thresholds: &DiagnosticThresholds,
) -> (Vec<ParamDiagnostics>, Vec<ConvergenceWarning>) {
    let mut diagnostics = Vec::with_capacity(keys.len());
    let mut warnings = Vec::new();

    for (key, pooled) in keys.iter().zip(draws) {
        let chains: Vec<Vec<f64>> = (0..n_chains)
            .map(|c| pooled[c * n_draws..(c + 1) * n_draws].to_vec())
            .collect();

        let rhat = rank_normalized_split_rhat(&chains);
        let ess = bulk_ess(&chains);

        if let Some(rhat) = rhat {
            if rhat > thresholds.max_rhat {
                warnings.push(ConvergenceWarning::HighRhat {
                    key: key.clone(),
                    rhat,
                });
            }
        }
        if let Some(ess) = ess {
            if ess < thresholds.min_ess {
                warnings.push(ConvergenceWarning::LowEss {
                    key: key.clone(),
                    ess,
                });
            }
        }

        diagnostics.push(ParamDiagnostics {
            key: key.clone(),
            rhat,
            ess,
        });
    }

    (diagnostics, warnings)
}

/// Rank-normalized split R-hat across chains of one parameter.
///
/// Returns `None` when fewer than 4 draws per chain are available or the
/// draws are (numerically) constant.
pub fn rank_normalized_split_rhat(chains: &[Vec<f64>]) -> Option<f64> {
    let normalized = rank_normalize(chains)?;
    let split = split_chains(&normalized)?;
    potential_scale_reduction(&split)
}

/// Bulk effective sample size: ESS of the rank-normalized split chains.
///
/// Capped at `S * log10(S)` for `S` total draws, as in the reference
/// implementation. Returns `None` on degenerate input.
pub fn bulk_ess(chains: &[Vec<f64>]) -> Option<f64> {
    let normalized = rank_normalize(chains)?;
    let split = split_chains(&normalized)?;
    effective_sample_size(&split)
}

/// Replace every draw by the standard-normal quantile of its rank within
/// the pooled sample, preserving the chain layout.
fn rank_normalize(chains: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    if chains.is_empty() || chains.iter().any(|c| c.is_empty()) {
        return None;
    }
    let pooled: Vec<f64> = chains.iter().flatten().copied().collect();
    let first = pooled[0];
    if pooled.iter().all(|&x| (x - first).abs() < 1e-12) {
        return None;
    }
    let scores = normal_scores(&pooled);

    let mut out = Vec::with_capacity(chains.len());
    let mut offset = 0;
    for chain in chains {
        out.push(scores[offset..offset + chain.len()].to_vec());
        offset += chain.len();
    }
    Some(out)
}

/// Split each chain into two halves. When a chain's length is odd, the
/// middle draw is dropped, per the Stan reference implementation.
fn split_chains(chains: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let num_draws = chains.iter().map(Vec::len).min()?;
    if num_draws < 4 {
        return None;
    }
    let (half, offset) = if num_draws % 2 == 0 {
        (num_draws / 2, 0)
    } else {
        ((num_draws - 1) / 2, 1)
    };
    let mut split = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        split.push(chain[..half].to_vec());
        split.push(chain[half + offset..num_draws].to_vec());
    }
    Some(split)
}

/// Classic potential scale reduction over the given chains.
fn potential_scale_reduction(chains: &[Vec<f64>]) -> Option<f64> {
    let n = chains.iter().map(Vec::len).min()? as f64;
    if n < 2.0 {
        return None;
    }
    let chain_means: Vec<f64> = chains.iter().map(|c| mean(c)).collect();
    let chain_vars: Vec<f64> = chains.iter().map(|c| sample_variance(c)).collect();

    let var_between = n * sample_variance(&chain_means);
    let var_within = mean(&chain_vars);
    if !var_within.is_finite() || var_within <= 1e-300 {
        return None;
    }
    Some(((var_between / var_within + n - 1.0) / n).sqrt())
}

/// Effective sample size via Geyer's initial monotone sequence.
fn effective_sample_size(chains: &[Vec<f64>]) -> Option<f64> {
    let m = chains.len();
    let n = chains.iter().map(Vec::len).min()?;
    if n < 4 {
        return None;
    }

    let chain_means: Vec<f64> = chains.iter().map(|c| mean(&c[..n])).collect();
    let chain_acov0: Vec<f64> = chains.iter().map(|c| autocovariance(&c[..n], 0)).collect();
    let chain_vars: Vec<f64> = chain_acov0
        .iter()
        .map(|&a| a * n as f64 / (n as f64 - 1.0))
        .collect();

    let mean_var = mean(&chain_vars);
    let mut var_plus = mean_var * (n as f64 - 1.0) / n as f64;
    if m > 1 {
        var_plus += sample_variance(&chain_means);
    }
    if !var_plus.is_finite() || var_plus <= 1e-300 {
        return None;
    }

    // Mean autocovariance across chains at one lag, computed on demand;
    // the Geyer loop usually terminates after a handful of lags.
    let mean_acov = |lag: usize| -> f64 {
        mean(
            &chains
                .iter()
                .map(|c| autocovariance(&c[..n], lag))
                .collect::<Vec<f64>>(),
        )
    };

    let mut rho_hat: Vec<f64> = vec![0.0; n];
    let mut rho_even = 1.0;
    rho_hat[0] = rho_even;
    let mut rho_odd = 1.0 - (mean_var - mean_acov(1)) / var_plus;
    rho_hat[1] = rho_odd;

    // Geyer's initial positive sequence.
    let mut s = 1;
    while s < n - 4 && (rho_even + rho_odd) > 0.0 {
        rho_even = 1.0 - (mean_var - mean_acov(s + 1)) / var_plus;
        rho_odd = 1.0 - (mean_var - mean_acov(s + 2)) / var_plus;
        if rho_even + rho_odd >= 0.0 {
            rho_hat[s + 1] = rho_even;
            rho_hat[s + 2] = rho_odd;
        }
        s += 2;
    }
    let max_s = s;
    // Improved estimate reduces variance for antithetic chains.
    if rho_even > 0.0 {
        rho_hat[max_s + 1] = rho_even;
    }

    // Convert to an initial monotone sequence.
    let mut s = 1;
    while max_s >= 3 && s <= max_s - 3 {
        if rho_hat[s + 1] + rho_hat[s + 2] > rho_hat[s - 1] + rho_hat[s] {
            rho_hat[s + 1] = (rho_hat[s - 1] + rho_hat[s]) / 2.0;
            rho_hat[s + 2] = rho_hat[s + 1];
        }
        s += 2;
    }

    let total = (m * n) as f64;
    let tau_hat: f64 = -1.0 + 2.0 * rho_hat.iter().take(max_s).sum::<f64>() + rho_hat[max_s + 1];
    Some((total / tau_hat).min(total * total.log10()))
}
