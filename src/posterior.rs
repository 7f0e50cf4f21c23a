//! Posterior sample sets with name-keyed parameters.
//!
//! Every parameter is addressed by a semantic [`ParamKey`], never by
//! position: the full and reduced scenarios can have different numbers of
//! visit levels and interaction cells, so positional indexing across fits
//! would silently pair unrelated parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::diagnostics::{ConvergenceWarning, ParamDiagnostics};
use crate::statistics;
use crate::types::FitTag;

/// Semantic identity of one model parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKey {
    /// Global intercept `mu`.
    Intercept,
    /// Hyper-mean of the pooled year effects.
    YearHyper,
    /// Pooled effect of one year, hyper-mean included.
    Year(String),
    /// Unpooled effect of one second-factor level (a visit or a site).
    Level(String),
    /// Hyper-mean of the pooled interaction effects.
    CellHyper,
    /// Pooled effect of one (year, level) interaction cell, hyper-mean
    /// included.
    Cell {
        /// Year label of the cell.
        year: String,
        /// Second-factor label of the cell.
        level: String,
    },
    /// Residual scale `sigma`.
    ResidScale,
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamKey::Intercept => write!(f, "mu"),
            ParamKey::YearHyper => write!(f, "year_mean"),
            ParamKey::Year(label) => write!(f, "year[{}]", label),
            ParamKey::Level(label) => write!(f, "level[{}]", label),
            ParamKey::CellHyper => write!(f, "cell_mean"),
            ParamKey::Cell { year, level } => write!(f, "cell[{}:{}]", year, level),
            ParamKey::ResidScale => write!(f, "sigma"),
        }
    }
}

/// Posterior summary of one parameter: median with 50% and 90% credible
/// intervals.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSummary {
    /// The parameter.
    pub key: ParamKey,
    /// Posterior median.
    pub median: f64,
    /// 50% credible interval (25th to 75th percentile).
    pub interval50: (f64, f64),
    /// 90% credible interval (5th to 95th percentile).
    pub interval90: (f64, f64),
}

impl ParamSummary {
    /// Summarize a vector of draws.
    pub(crate) fn from_draws(key: ParamKey, draws: &[f64]) -> Self {
        let mut sorted = draws.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self {
            key,
            median: statistics::quantile_sorted(&sorted, 0.5),
            interval50: (
                statistics::quantile_sorted(&sorted, 0.25),
                statistics::quantile_sorted(&sorted, 0.75),
            ),
            interval90: (
                statistics::quantile_sorted(&sorted, 0.05),
                statistics::quantile_sorted(&sorted, 0.95),
            ),
        }
    }
}

/// The output of one model fit: named posterior draws for every parameter,
/// with chain structure preserved and convergence diagnostics attached.
///
/// Invariant: every parameter holds exactly `n_chains × n_draws_per_chain`
/// draws, stored chain-major (chain 0's draws first), so per-chain slices
/// remain recoverable after pooling.
#[derive(Debug, Clone)]
pub struct SampleSet {
    tag: FitTag,
    keys: Vec<ParamKey>,
    index: HashMap<ParamKey, usize>,
    /// Draws per parameter, chain-major.
    draws: Vec<Vec<f64>>,
    n_chains: usize,
    n_draws_per_chain: usize,
    diagnostics: Vec<ParamDiagnostics>,
    warnings: Vec<ConvergenceWarning>,
}

impl SampleSet {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        tag: FitTag,
        keys: Vec<ParamKey>,
        draws: Vec<Vec<f64>>,
        n_chains: usize,
        n_draws_per_chain: usize,
        diagnostics: Vec<ParamDiagnostics>,
        warnings: Vec<ConvergenceWarning>,
    ) -> Self {
        debug_assert_eq!(keys.len(), draws.len());
        debug_assert!(draws
            .iter()
            .all(|d| d.len() == n_chains * n_draws_per_chain));
        let index = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        Self {
            tag,
            keys,
            index,
            draws,
            n_chains,
            n_draws_per_chain,
            diagnostics,
            warnings,
        }
    }

    /// Which fit produced this sample set.
    pub fn tag(&self) -> FitTag {
        self.tag
    }

    /// Parameter keys in model order.
    pub fn keys(&self) -> &[ParamKey] {
        &self.keys
    }

    /// Whether a parameter exists in this sample set.
    pub fn contains(&self, key: &ParamKey) -> bool {
        self.index.contains_key(key)
    }

    /// Number of chains pooled into this set.
    pub fn n_chains(&self) -> usize {
        self.n_chains
    }

    /// Retained draws per chain.
    pub fn n_draws_per_chain(&self) -> usize {
        self.n_draws_per_chain
    }

    /// Total pooled draws per parameter.
    pub fn total_draws(&self) -> usize {
        self.n_chains * self.n_draws_per_chain
    }

    /// All pooled draws of one parameter, chain-major.
    pub fn draws(&self, key: &ParamKey) -> Option<&[f64]> {
        self.index.get(key).map(|&i| self.draws[i].as_slice())
    }

    /// One chain's draws of one parameter.
    pub fn chain_draws(&self, key: &ParamKey, chain: usize) -> Option<&[f64]> {
        if chain >= self.n_chains {
            return None;
        }
        self.draws(key).map(|all| {
            let start = chain * self.n_draws_per_chain;
            &all[start..start + self.n_draws_per_chain]
        })
    }

    /// Posterior summary of one parameter.
    pub fn summary(&self, key: &ParamKey) -> Option<ParamSummary> {
        self.draws(key)
            .map(|d| ParamSummary::from_draws(key.clone(), d))
    }

    /// Posterior summaries for every parameter, in model order.
    pub fn summaries(&self) -> Vec<ParamSummary> {
        self.keys
            .iter()
            .map(|k| {
                let draws = self.draws(k).expect("key from own table");
                ParamSummary::from_draws(k.clone(), draws)
            })
            .collect()
    }

    /// Per-parameter convergence diagnostics, in model order.
    pub fn diagnostics(&self) -> &[ParamDiagnostics] {
        &self.diagnostics
    }

    /// Convergence warnings raised for this fit. Empty means the
    /// diagnostics stayed within thresholds.
    pub fn warnings(&self) -> &[ConvergenceWarning] {
        &self.warnings
    }
}
