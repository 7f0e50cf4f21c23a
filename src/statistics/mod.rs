//! Small statistics toolbox used by the sampler, diagnostics, and summaries.
//!
//! Quantiles use linear interpolation between order statistics; variance
//! uses Bessel's correction; the autocovariance estimator matches the
//! convention of MCMC effective-sample-size computations (normalized by
//! `n`, not `n - lag`).

use statrs::distribution::{ContinuousCDF, Normal};

/// Arithmetic mean. Empty input returns NaN.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance with Bessel's correction. Needs at least two values.
pub fn sample_variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() as f64 - 1.0)
}

/// Quantile via linear interpolation between order statistics.
///
/// `q` must be in [0, 1]. The input does not need to be sorted.
pub fn quantile(xs: &[f64], q: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&q), "quantile q must be in [0, 1]");
    if xs.is_empty() {
        return f64::NAN;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

/// Quantile of an already ascending-sorted slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() as f64 - 1.0) * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Median (0.5 quantile).
pub fn median(xs: &[f64]) -> f64 {
    quantile(xs, 0.5)
}

/// Autocovariance at the given lag, normalized by `n`.
///
/// The `1/n` normalization (rather than `1/(n - lag)`) keeps the Geyer
/// initial-sequence estimator consistent across lags.
pub fn autocovariance(xs: &[f64], lag: usize) -> f64 {
    let n = xs.len();
    if lag >= n {
        return 0.0;
    }
    let m = mean(xs);
    let mut acc = 0.0;
    for t in 0..(n - lag) {
        acc += (xs[t] - m) * (xs[t + lag] - m);
    }
    acc / n as f64
}

/// Rank-normal scores for a pooled collection of draws.
///
/// Each value is replaced by the standard-normal quantile of its fractional
/// rank, using the Blom offset `(r - 3/8) / (n + 1/4)`. Ties receive their
/// average rank so the transform is symmetric in its inputs.
pub fn normal_scores(xs: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));

    // Average ranks over runs of tied values (1-based).
    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && xs[order[end]] == xs[order[start]] {
            end += 1;
        }
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let std_normal = Normal::new(0.0, 1.0).expect("unit normal is well-formed");
    ranks
        .into_iter()
        .map(|r| std_normal.inverse_cdf((r - 0.375) / (n as f64 + 0.25)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mean_and_variance() {
        // Reference values computed with numpy.
        let xs = [
            2.13829088,
            -1.06214379,
            -0.79265699,
            -0.21300888,
            -1.07155142,
            -0.50425317,
            0.95708854,
            -1.23854172,
            1.37124938,
            1.17658286,
        ];
        assert_abs_diff_eq!(mean(&xs), 0.07610557018217139, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_variance(&xs), 1.492596054209826, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(mean(&[]).is_nan());
        assert!(sample_variance(&[1.0]).is_nan());
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_quantile_interpolation() {
        let xs = [4.0, 1.0, 3.0, 2.0];
        assert_abs_diff_eq!(quantile(&xs, 0.0), 1.0);
        assert_abs_diff_eq!(quantile(&xs, 1.0), 4.0);
        assert_abs_diff_eq!(quantile(&xs, 0.5), 2.5);
        assert_abs_diff_eq!(median(&xs), 2.5);
        // numpy.quantile([1,2,3,4], 0.9) = 3.7
        assert_abs_diff_eq!(quantile(&xs, 0.9), 3.7, epsilon = 1e-12);
    }

    #[test]
    fn test_autocovariance_lag_zero_is_population_variance() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let n = xs.len() as f64;
        let expected = sample_variance(&xs) * (n - 1.0) / n;
        assert_abs_diff_eq!(autocovariance(&xs, 0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_autocovariance_beyond_length_is_zero() {
        let xs = [1.0, 2.0];
        assert_eq!(autocovariance(&xs, 5), 0.0);
    }

    #[test]
    fn test_normal_scores_are_monotone_and_centered() {
        let xs = [0.3, -1.2, 2.5, 0.9];
        let z = normal_scores(&xs);
        // Order preserved
        assert!(z[1] < z[0] && z[0] < z[3] && z[3] < z[2]);
        // Blom scores are symmetric around zero
        assert_abs_diff_eq!(z.iter().sum::<f64>(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normal_scores_average_tied_ranks() {
        let xs = [1.0, 1.0, 2.0];
        let z = normal_scores(&xs);
        assert_eq!(z[0], z[1]);
        assert!(z[0] < z[2]);
    }
}
