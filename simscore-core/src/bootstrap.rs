//! Percentile bootstrap confidence intervals for the mean.
//!
//! Each trial resamples `n` values with replacement and records the resample
//! mean. The sorted trial means are indexed at `floor(alpha/2 * iterations)`
//! and `floor((1 - alpha/2) * iterations)` for the lower and upper bound.
//! No bias correction is applied.
//!
//! An empty sample (or zero iterations) yields `(NaN, NaN)`; callers check for
//! NaN rather than expecting an error. Non-finite input values propagate into
//! the bounds unchanged.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Bootstrap settings, optionally seeded for reproducible intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bootstrap {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            alpha: DEFAULT_ALPHA,
            seed: None,
        }
    }
}

fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

impl Bootstrap {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Random source for one estimation pass: seeded when a seed is set,
    /// fresh entropy otherwise.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Estimate a confidence interval using a new random source.
    pub fn estimate(&self, values: &[f64]) -> (f64, f64) {
        let mut rng = self.rng();
        bootstrap_ci_with_rng(values, self.iterations, self.alpha, &mut rng)
    }
}

/// Percentile bootstrap CI for the mean of `values`, using a thread-local RNG.
pub fn bootstrap_ci(values: &[f64], iterations: usize, alpha: f64) -> (f64, f64) {
    let mut rng = rand::thread_rng();
    bootstrap_ci_with_rng(values, iterations, alpha, &mut rng)
}

/// Percentile bootstrap CI for the mean of `values`, drawing from `rng`.
pub fn bootstrap_ci_with_rng<R: Rng + ?Sized>(
    values: &[f64],
    iterations: usize,
    alpha: f64,
    rng: &mut R,
) -> (f64, f64) {
    if values.is_empty() || iterations == 0 {
        warn!(
            samples = values.len(),
            iterations, "Empty bootstrap sample; interval is NaN"
        );
        return (f64::NAN, f64::NAN);
    }

    let n = values.len();
    let mut means = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut sum = 0.0;
        for _ in 0..n {
            sum += values[rng.gen_range(0..n)];
        }
        means.push(sum / n as f64);
    }

    means.sort_by(f64::total_cmp);

    let last = iterations - 1;
    let lo_rank = percentile_rank(alpha / 2.0, iterations).min(last);
    let hi_rank = percentile_rank(1.0 - alpha / 2.0, iterations).min(last);
    (means[lo_rank], means[hi_rank])
}

fn percentile_rank(q: f64, iterations: usize) -> usize {
    let rank = (q * iterations as f64).floor();
    if rank.is_finite() && rank > 0.0 {
        rank as usize
    } else {
        0
    }
}
