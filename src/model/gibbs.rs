//! Single-chain Gibbs sampler for the hierarchical model.
//!
//! All location parameters (`mu`, the hyper-means, the raw pooled
//! deviations, and the unpooled `beta` levels) have Gaussian full
//! conditionals given `sigma`, so each is updated with an exact conjugate
//! draw. The residual scale's Exponential(1) prior is not conjugate;
//! `sigma` moves by random-walk Metropolis on `log sigma` inside the scan,
//! with the proposal scale adapted toward a 0.3-0.5 acceptance rate during
//! warmup only. Retained draws therefore come from a fixed transition
//! kernel and are reproducible given the seed.
//!
//! The additive mean leaves several directions unidentified by the
//! likelihood (e.g. shifting `mu` up while shifting every `beta` level
//! down). Scanning one parameter at a time random-walks through those
//! directions, so each sweep ends with exact Gibbs draws along them:
//! the restriction of the posterior to an invariant direction is just the
//! restriction of the prior, a one-dimensional Gaussian.
//!
//! The sampler maintains the full residual vector `r_i = y_i - mean_i`
//! incrementally: updating a parameter shifts the residuals of its own
//! observations by the change, so one full scan is O(n) per factor.
//! Translation moves never touch the residuals at all.

use rand::Rng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::SamplerConfig;

use super::{ModelSpec, PRIOR_INTERCEPT_SD, PRIOR_UNIT_SD};

/// Initial random-walk proposal scale on `log sigma`.
const INITIAL_STEP: f64 = 0.3;

/// Iterations per warmup adaptation window.
const ADAPT_WINDOW: usize = 50;

/// Acceptance-rate band targeted by the warmup adaptation.
const ACCEPT_LOW: f64 = 0.3;
const ACCEPT_HIGH: f64 = 0.5;

/// Retained draws of one chain, laid out `[parameter][iteration]` in
/// [`ModelSpec::param_keys`] order.
pub(crate) struct ChainDraws {
    pub draws: Vec<Vec<f64>>,
}

/// Run one chain. `chain_index` decorrelates the seed and the starting
/// point from the other chains of the same fit.
pub(crate) fn run_chain(
    spec: &ModelSpec,
    config: &SamplerConfig,
    chain_index: usize,
) -> Result<ChainDraws, String> {
    let seed = config
        .seed
        .wrapping_add((chain_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let groups = Groups::index(spec);
    let mut state = State::overdispersed(spec, &mut rng);

    // Full residual vector, kept in sync with the state.
    let mut resid: Vec<f64> = (0..spec.len())
        .map(|i| spec.response[i] - state.mean_for(spec, i))
        .collect();

    let n_params = 3 + spec.n_factor1 + spec.n_factor2 + spec.n_cells + 1;
    let mut draws: Vec<Vec<f64>> = vec![Vec::with_capacity(config.draws); n_params];

    let mut step = INITIAL_STEP;
    let mut accepted = 0usize;
    let total = config.warmup + config.draws;

    for iter in 0..total {
        let sigma2 = state.sigma * state.sigma;

        // Global intercept.
        state.mu = update_location(
            &mut resid,
            &groups.all,
            state.mu,
            PRIOR_INTERCEPT_SD,
            sigma2,
            &mut rng,
        );

        // Year effects: hyper-mean over all observations, raw deviations
        // per level, both with unit prior scale.
        state.alpha_hyper = update_location(
            &mut resid,
            &groups.all,
            state.alpha_hyper,
            PRIOR_UNIT_SD,
            sigma2,
            &mut rng,
        );
        for j in 0..spec.n_factor1 {
            state.alpha_raw[j] = update_location(
                &mut resid,
                &groups.by_factor1[j],
                state.alpha_raw[j],
                PRIOR_UNIT_SD,
                sigma2,
                &mut rng,
            );
        }

        // Unpooled second-factor levels.
        for j in 0..spec.n_factor2 {
            state.beta[j] = update_location(
                &mut resid,
                &groups.by_factor2[j],
                state.beta[j],
                PRIOR_UNIT_SD,
                sigma2,
                &mut rng,
            );
        }

        // Interaction cells, pooled like the year effects.
        state.gamma_hyper = update_location(
            &mut resid,
            &groups.all,
            state.gamma_hyper,
            PRIOR_UNIT_SD,
            sigma2,
            &mut rng,
        );
        for k in 0..spec.n_cells {
            state.gamma_raw[k] = update_location(
                &mut resid,
                &groups.by_cell[k],
                state.gamma_raw[k],
                PRIOR_UNIT_SD,
                sigma2,
                &mut rng,
            );
        }

        state.recenter(&groups, &mut rng);

        // Residual scale.
        if update_sigma(&mut state.sigma, &resid, step, &mut rng) {
            accepted += 1;
        }

        if !state.sigma.is_finite() || !state.mu.is_finite() {
            return Err(format!("non-finite state at iteration {}", iter));
        }

        // Warmup-only step adaptation, in windows.
        if iter < config.warmup && (iter + 1) % ADAPT_WINDOW == 0 {
            let rate = accepted as f64 / ADAPT_WINDOW as f64;
            if rate > ACCEPT_HIGH {
                step *= 1.1;
            } else if rate < ACCEPT_LOW {
                step *= 0.9;
            }
            accepted = 0;
        }

        if iter >= config.warmup {
            record(spec, &state, &mut draws);
        }
    }

    Ok(ChainDraws { draws })
}

/// Conjugate update of one additive location parameter.
///
/// The full conditional of a parameter with prior `Normal(0, prior_sd)`
/// appearing in the mean of the observations in `group` is Gaussian with
/// precision `1/prior_sd^2 + |group|/sigma^2`. `resid` is updated in place
/// so it stays equal to `y - mean` after the move.
fn update_location(
    resid: &mut [f64],
    group: &[usize],
    current: f64,
    prior_sd: f64,
    sigma2: f64,
    rng: &mut Xoshiro256PlusPlus,
) -> f64 {
    let count = group.len() as f64;
    // Partial residuals: what the group's observations look like with this
    // parameter removed from the mean.
    let partial_sum: f64 = group.iter().map(|&i| resid[i] + current).sum();

    let precision = 1.0 / (prior_sd * prior_sd) + count / sigma2;
    let mean = (partial_sum / sigma2) / precision;
    let z: f64 = StandardNormal.sample(rng);
    let new = mean + z / precision.sqrt();

    let shift = current - new;
    for &i in group {
        resid[i] += shift;
    }
    new
}

/// Exact Gibbs draw along a likelihood-invariant direction: `a` moves by
/// `+t` while every listed unit-prior parameter moves by `-t`. The
/// restricted posterior for `t` is Gaussian with precision
/// `1/sd_a^2 + |others|`.
fn translate(
    a: &mut f64,
    sd_a: f64,
    others: &mut [f64],
    idx: &[usize],
    rng: &mut Xoshiro256PlusPlus,
) {
    let prior_prec_a = 1.0 / (sd_a * sd_a);
    let precision = prior_prec_a + idx.len() as f64;
    let sum_others: f64 = idx.iter().map(|&i| others[i]).sum();
    let mean = (-*a * prior_prec_a + sum_others) / precision;
    let z: f64 = StandardNormal.sample(rng);
    let t = mean + z / precision.sqrt();
    *a += t;
    for &i in idx {
        others[i] -= t;
    }
}

/// Metropolis step on `log sigma`. Returns whether the proposal was
/// accepted.
fn update_sigma(sigma: &mut f64, resid: &[f64], step: f64, rng: &mut Xoshiro256PlusPlus) -> bool {
    let n = resid.len() as f64;
    let ssr: f64 = resid.iter().map(|r| r * r).sum();

    // Log posterior of sigma up to a constant, including the log-scale
    // Jacobian: -n ln(s) - ssr/(2 s^2) - s + ln(s).
    let log_post = |s: f64| -> f64 { -n * s.ln() - ssr / (2.0 * s * s) - s + s.ln() };

    let z: f64 = StandardNormal.sample(rng);
    let proposal = (sigma.ln() + step * z).exp();
    if !proposal.is_finite() || proposal <= 0.0 {
        return false;
    }

    let log_ratio = log_post(proposal) - log_post(*sigma);
    let u: f64 = rng.random();
    if u.ln() < log_ratio {
        *sigma = proposal;
        true
    } else {
        false
    }
}

/// Append the reported parameters of the current state, in
/// [`ModelSpec::param_keys`] order.
fn record(spec: &ModelSpec, state: &State, draws: &mut [Vec<f64>]) {
    let mut p = 0;
    let mut push = |value: f64| {
        draws[p].push(value);
        p += 1;
    };

    push(state.mu);
    push(state.alpha_hyper);
    for j in 0..spec.n_factor1 {
        push(state.alpha_hyper + state.alpha_raw[j]);
    }
    for j in 0..spec.n_factor2 {
        push(state.beta[j]);
    }
    push(state.gamma_hyper);
    for k in 0..spec.n_cells {
        push(state.gamma_hyper + state.gamma_raw[k]);
    }
    push(state.sigma);
}

/// Observation indices grouped by factor level, plus the cell-index lists
/// used by the translation moves.
struct Groups {
    all: Vec<usize>,
    by_factor1: Vec<Vec<usize>>,
    by_factor2: Vec<Vec<usize>>,
    by_cell: Vec<Vec<usize>>,
    /// For each factor-1 level, the interaction cells belonging to it.
    cells_of_factor1: Vec<Vec<usize>>,
    /// For each factor-2 level, the interaction cells belonging to it.
    cells_of_factor2: Vec<Vec<usize>>,
    all_factor1: Vec<usize>,
    all_factor2: Vec<usize>,
    all_cells: Vec<usize>,
}

impl Groups {
    fn index(spec: &ModelSpec) -> Self {
        let mut by_factor1 = vec![Vec::new(); spec.n_factor1];
        let mut by_factor2 = vec![Vec::new(); spec.n_factor2];
        let mut by_cell = vec![Vec::new(); spec.n_cells];
        for i in 0..spec.len() {
            by_factor1[spec.factor1[i] - 1].push(i);
            by_factor2[spec.factor2[i] - 1].push(i);
            by_cell[spec.cells[i] - 1].push(i);
        }

        let mut cells_of_factor1 = vec![Vec::new(); spec.n_factor1];
        let mut cells_of_factor2 = vec![Vec::new(); spec.n_factor2];
        for (k, (year, level)) in spec.cell_labels.iter().enumerate() {
            let j = spec
                .factor1_labels
                .iter()
                .position(|l| l == year)
                .expect("cell labels reference known factor-1 labels");
            cells_of_factor1[j].push(k);
            let l = spec
                .factor2_labels
                .iter()
                .position(|x| x == level)
                .expect("cell labels reference known factor-2 labels");
            cells_of_factor2[l].push(k);
        }

        Self {
            all: (0..spec.len()).collect(),
            by_factor1,
            by_factor2,
            by_cell,
            cells_of_factor1,
            cells_of_factor2,
            all_factor1: (0..spec.n_factor1).collect(),
            all_factor2: (0..spec.n_factor2).collect(),
            all_cells: (0..spec.n_cells).collect(),
        }
    }
}

/// Current position of one chain in parameter space.
struct State {
    mu: f64,
    alpha_hyper: f64,
    alpha_raw: Vec<f64>,
    beta: Vec<f64>,
    gamma_hyper: f64,
    gamma_raw: Vec<f64>,
    sigma: f64,
}

impl State {
    /// Over-dispersed random starting point.
    fn overdispersed(spec: &ModelSpec, rng: &mut Xoshiro256PlusPlus) -> Self {
        let mut normal = |scale: f64| -> f64 {
            let z: f64 = StandardNormal.sample(rng);
            scale * z
        };
        Self {
            mu: normal(2.0),
            alpha_hyper: normal(1.0),
            alpha_raw: (0..spec.n_factor1).map(|_| normal(1.0)).collect(),
            beta: (0..spec.n_factor2).map(|_| normal(1.0)).collect(),
            gamma_hyper: normal(1.0),
            gamma_raw: (0..spec.n_cells).map(|_| normal(1.0)).collect(),
            sigma: normal(0.5).exp(),
        }
    }

    fn mean_for(&self, spec: &ModelSpec, i: usize) -> f64 {
        self.mu
            + self.alpha_hyper
            + self.alpha_raw[spec.factor1[i] - 1]
            + self.beta[spec.factor2[i] - 1]
            + self.gamma_hyper
            + self.gamma_raw[spec.cells[i] - 1]
    }

    /// Gibbs draws along every likelihood-invariant direction of the
    /// additive mean. Each move leaves the fitted means (and therefore the
    /// residuals) unchanged.
    fn recenter(&mut self, groups: &Groups, rng: &mut Xoshiro256PlusPlus) {
        // mu against each of the other global intercepts.
        let mut hyper = [self.alpha_hyper];
        translate(&mut self.mu, PRIOR_INTERCEPT_SD, &mut hyper, &[0], rng);
        self.alpha_hyper = hyper[0];
        let mut hyper = [self.gamma_hyper];
        translate(&mut self.mu, PRIOR_INTERCEPT_SD, &mut hyper, &[0], rng);
        self.gamma_hyper = hyper[0];

        // mu against the whole unpooled block.
        translate(
            &mut self.mu,
            PRIOR_INTERCEPT_SD,
            &mut self.beta,
            &groups.all_factor2,
            rng,
        );

        // Hyper-means against their raw deviations.
        translate(
            &mut self.alpha_hyper,
            PRIOR_UNIT_SD,
            &mut self.alpha_raw,
            &groups.all_factor1,
            rng,
        );
        translate(
            &mut self.gamma_hyper,
            PRIOR_UNIT_SD,
            &mut self.gamma_raw,
            &groups.all_cells,
            rng,
        );

        // Each year's deviation against that year's interaction cells, and
        // each level against its cells.
        for j in 0..self.alpha_raw.len() {
            let mut a = self.alpha_raw[j];
            translate(
                &mut a,
                PRIOR_UNIT_SD,
                &mut self.gamma_raw,
                &groups.cells_of_factor1[j],
                rng,
            );
            self.alpha_raw[j] = a;
        }
        for l in 0..self.beta.len() {
            let mut b = self.beta[l];
            translate(
                &mut b,
                PRIOR_UNIT_SD,
                &mut self.gamma_raw,
                &groups.cells_of_factor2[l],
                rng,
            );
            self.beta[l] = b;
        }
    }
}
