//! Configuration for the posterior sampler and convergence diagnostics.
//!
//! One `SamplerConfig` is passed uniformly to every fit in the study batch,
//! so chain counts and iteration budgets are defined in exactly one place.

/// Configuration options for a posterior sampler run.
///
/// The defaults reproduce the study design: 4 independent chains, 2000
/// warmup iterations discarded per chain, 1000 retained iterations per
/// chain, for 4000 retained draws in total.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Number of independent chains. Default: 4.
    pub chains: usize,

    /// Warmup iterations discarded per chain. The residual-scale proposal
    /// step adapts only during warmup. Default: 2000.
    pub warmup: usize,

    /// Retained iterations per chain. Default: 1000.
    pub draws: usize,

    /// Base RNG seed. Each chain derives its own seed from this value and
    /// its chain index, so runs are reproducible end to end. Default: 42.
    pub seed: u64,

    /// Thresholds at which convergence diagnostics raise warnings.
    pub thresholds: DiagnosticThresholds,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            chains: 4,
            warmup: 2000,
            draws: 1000,
            seed: 42,
            thresholds: DiagnosticThresholds::default(),
        }
    }
}

impl SamplerConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a quick configuration for development and tests.
    ///
    /// Uses minimal iteration budgets for rapid iteration:
    /// - 2 chains
    /// - 500 warmup, 500 retained iterations per chain
    pub fn quick() -> Self {
        Self {
            chains: 2,
            warmup: 500,
            draws: 500,
            ..Default::default()
        }
    }

    /// Create a thorough configuration for final reporting runs.
    ///
    /// Uses generous iteration budgets:
    /// - 4 chains
    /// - 5000 warmup, 2500 retained iterations per chain
    pub fn thorough() -> Self {
        Self {
            warmup: 5000,
            draws: 2500,
            ..Default::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the number of chains.
    pub fn chains(mut self, n: usize) -> Self {
        assert!(n > 0, "chains must be positive");
        self.chains = n;
        self
    }

    /// Set the warmup iterations per chain.
    pub fn warmup(mut self, n: usize) -> Self {
        self.warmup = n;
        self
    }

    /// Set the retained iterations per chain.
    pub fn draws(mut self, n: usize) -> Self {
        assert!(n > 0, "draws must be positive");
        self.draws = n;
        self
    }

    /// Set the base RNG seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the diagnostic thresholds.
    pub fn thresholds(mut self, thresholds: DiagnosticThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Total retained draws across all chains.
    pub fn total_draws(&self) -> usize {
        self.chains * self.draws
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.chains == 0 {
            return Err("chains must be positive".to_string());
        }
        if self.draws == 0 {
            return Err("draws must be positive".to_string());
        }
        if self.chains >= 2 && self.draws < 4 {
            return Err("at least 4 draws per chain are needed for diagnostics".to_string());
        }
        Ok(())
    }
}

/// Thresholds for attaching convergence warnings to a sample set.
///
/// Both follow the usual guidance for rank-normalized diagnostics: split
/// R-hat above 1.01 or bulk effective sample size below roughly 100 per
/// chain indicates the posterior summary may be unreliable.
#[derive(Debug, Clone)]
pub struct DiagnosticThresholds {
    /// Largest acceptable rank-normalized split R-hat. Default: 1.01.
    pub max_rhat: f64,

    /// Smallest acceptable bulk effective sample size. Default: 400.
    pub min_ess: f64,
}

impl Default for DiagnosticThresholds {
    fn default() -> Self {
        Self {
            max_rhat: 1.01,
            min_ess: 400.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SamplerConfig::default();
        assert_eq!(config.chains, 4);
        assert_eq!(config.warmup, 2000);
        assert_eq!(config.draws, 1000);
        assert_eq!(config.total_draws(), 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_configs() {
        let quick = SamplerConfig::quick();
        assert_eq!(quick.chains, 2);
        assert_eq!(quick.total_draws(), 1000);

        let thorough = SamplerConfig::thorough();
        assert_eq!(thorough.chains, 4);
        assert_eq!(thorough.total_draws(), 10_000);
    }

    #[test]
    fn test_builder_methods() {
        let config = SamplerConfig::new().chains(2).warmup(100).draws(50).seed(7);
        assert_eq!(config.chains, 2);
        assert_eq!(config.warmup, 100);
        assert_eq!(config.draws, 50);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_validation_rejects_zero_draws() {
        let mut config = SamplerConfig::default();
        config.draws = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[should_panic]
    fn test_zero_chains_panics_in_builder() {
        SamplerConfig::new().chains(0);
    }
}
