//! Hierarchical regression model for log gas concentrations.
//!
//! The generative model for observation `i` is
//!
//! ```text
//! y_i = mu + alpha[f1_i] + beta[f2_i] + gamma[cell_i] + eps_i
//! eps_i ~ Normal(0, sigma)
//! ```
//!
//! with priors
//!
//! ```text
//! mu ~ Normal(0, 3)
//! alpha[j] = alpha_hyper + alpha_raw[j],   alpha_raw[j] ~ Normal(0, 1)
//! gamma[k] = gamma_hyper + gamma_raw[k],   gamma_raw[k] ~ Normal(0, 1)
//! beta[j] ~ Normal(0, 1)
//! alpha_hyper, gamma_hyper ~ Normal(0, 1)
//! sigma ~ Exponential(1)
//! ```
//!
//! `alpha` (year) and `gamma` (year x level cells) are partially pooled
//! around learned hyper-means with a *fixed unit* shrinkage scale — the
//! deviation scale is not estimated. `beta` (the visit or site levels under
//! direct study) is unpooled: each level gets its own independent,
//! unshrunk estimate.

pub mod diagnostics;
mod fit;
mod gibbs;

pub use fit::fit;

use crate::posterior::ParamKey;
use crate::types::Question;

/// Prior standard deviation of the global intercept.
pub const PRIOR_INTERCEPT_SD: f64 = 3.0;

/// Prior (and fixed shrinkage) standard deviation of every other location
/// parameter.
pub const PRIOR_UNIT_SD: f64 = 1.0;

/// Everything the sampler needs for one fit, derived from a validated
/// observation table. Immutable once constructed.
///
/// Factor codes are 1-based contiguous integers; `codes[i] - 1` indexes the
/// corresponding label table. Interaction codes cover only the (year,
/// level) cells actually present in the data, in first-appearance order.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Which second factor the codes describe.
    pub question: Question,
    /// Log-transformed response, one entry per observation.
    pub response: Vec<f64>,
    /// Number of distinct factor-1 (year) levels.
    pub n_factor1: usize,
    /// Factor-1 code per observation, in 1..=n_factor1.
    pub factor1: Vec<usize>,
    /// Number of distinct factor-2 (visit or site) levels.
    pub n_factor2: usize,
    /// Factor-2 code per observation, in 1..=n_factor2.
    pub factor2: Vec<usize>,
    /// Number of observed (year, level) interaction cells.
    pub n_cells: usize,
    /// Interaction code per observation, in 1..=n_cells.
    pub cells: Vec<usize>,
    /// Label of each factor-1 level.
    pub factor1_labels: Vec<String>,
    /// Label of each factor-2 level.
    pub factor2_labels: Vec<String>,
    /// (year label, level label) of each interaction cell.
    pub cell_labels: Vec<(String, String)>,
}

impl ModelSpec {
    /// Number of observations.
    pub fn len(&self) -> usize {
        self.response.len()
    }

    /// Whether the spec holds no observations. Never true for a spec built
    /// by the design-matrix builder.
    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    /// Keys of every reported parameter, in sampler storage order.
    pub fn param_keys(&self) -> Vec<ParamKey> {
        let mut keys =
            Vec::with_capacity(3 + self.n_factor1 + self.n_factor2 + self.n_cells + 1);
        keys.push(ParamKey::Intercept);
        keys.push(ParamKey::YearHyper);
        for label in &self.factor1_labels {
            keys.push(ParamKey::Year(label.clone()));
        }
        for label in &self.factor2_labels {
            keys.push(ParamKey::Level(label.clone()));
        }
        keys.push(ParamKey::CellHyper);
        for (year, level) in &self.cell_labels {
            keys.push(ParamKey::Cell {
                year: year.clone(),
                level: level.clone(),
            });
        }
        keys.push(ParamKey::ResidScale);
        keys
    }
}
