//! Monte Carlo sampling - RNG handle, sample generation and quantiles
//!
//! Every quantity carries `N` samples. The sampler owns the random number
//! generator and `N`, and is passed explicitly into every operation that
//! draws or permutes samples, so a seeded run is reproducible end to end.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::core::types::EvalMethod;

/// Default Monte Carlo sample count
pub const DEFAULT_SAMPLES: usize = 100_000;

/// Φ(1), Φ(2), Φ(3): one-sided normal probabilities at k standard deviations
const NORMAL_CDF: [f64; 3] = [0.841_344_746_068_542_9, 0.977_249_868_051_820_8, 0.998_650_101_968_369_9];

/// Random number source plus sample count for Monte Carlo propagation
#[derive(Debug, Clone)]
pub struct Sampler {
    rng: StdRng,
    samples: usize,
}

impl Sampler {
    /// Create a sampler seeded from the operating system
    pub fn new(samples: usize) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            samples: samples.max(1),
        }
    }

    /// Create a reproducible sampler
    pub fn seeded(samples: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            samples: samples.max(1),
        }
    }

    /// Number of samples per quantity (N)
    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// N samples uniformly distributed between `low` and `high`
    pub fn uniform(&mut self, low: f64, high: f64) -> Vec<f64> {
        let span = high - low;
        (0..self.samples)
            .map(|_| low + span * self.rng.random::<f64>())
            .collect()
    }

    /// N normally distributed samples
    pub fn normal(&mut self, mean: f64, sigma: f64) -> Vec<f64> {
        (0..self.samples)
            .map(|_| {
                // Box-Muller transform; 1 - u keeps the log argument in (0, 1]
                let u1: f64 = 1.0 - self.rng.random::<f64>();
                let u2: f64 = self.rng.random();
                let z = (-2.0_f64 * u1.ln()).sqrt() * (2.0_f64 * std::f64::consts::PI * u2).cos();
                mean + sigma * z
            })
            .collect()
    }

    /// N copies of a single value
    pub fn constant(&self, value: f64) -> Vec<f64> {
        vec![value; self.samples]
    }

    /// A fresh random permutation of existing samples
    pub fn permute(&mut self, data: &[f64]) -> Vec<f64> {
        let mut shuffled = data.to_vec();
        shuffled.shuffle(&mut self.rng);
        shuffled
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES)
    }
}

/// Lower and upper tail probabilities for a statistical method
///
/// Returns `None` for worst-case evaluation.
pub fn tail_probabilities(method: EvalMethod) -> Option<(f64, f64)> {
    let upper = match method {
        EvalMethod::WorstCase => return None,
        EvalMethod::Statistical1S => NORMAL_CDF[0],
        EvalMethod::Statistical2S => NORMAL_CDF[1],
        EvalMethod::Statistical3S => NORMAL_CDF[2],
    };
    Some((1.0 - upper, upper))
}

/// Sample quantile using the median-unbiased estimator (Hyndman & Fan type 8)
///
/// Matches numpy's `quantile(..., method="median_unbiased")`.
pub fn quantile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let alpha = 1.0 / 3.0;
    let p = p.clamp(0.0, 1.0);

    // zero-based virtual index: n*p + alpha + p*(1 - 2*alpha) - 1
    let virtual_index = n as f64 * p + alpha + p * (1.0 - 2.0 * alpha) - 1.0;
    if virtual_index <= 0.0 {
        return sorted[0];
    }
    if virtual_index >= (n - 1) as f64 {
        return sorted[n - 1];
    }

    let below = virtual_index.floor();
    let gamma = virtual_index - below;
    let i = below as usize;
    sorted[i] + gamma * (sorted[i + 1] - sorted[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_within_bounds() {
        let mut sampler = Sampler::seeded(10_000, 7);
        let data = sampler.uniform(4.8, 5.1);
        assert_eq!(data.len(), 10_000);
        assert!(data.iter().all(|&x| (4.8..=5.1).contains(&x)));
    }

    #[test]
    fn test_zero_width_uniform() {
        let mut sampler = Sampler::seeded(100, 7);
        let data = sampler.uniform(2.0, 2.0);
        assert!(data.iter().all(|&x| x == 2.0));
    }

    #[test]
    fn test_normal_moments() {
        let mut sampler = Sampler::seeded(50_000, 11);
        let data = sampler.normal(10.0, 0.5);
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        assert!((mean - 10.0).abs() < 0.02);
        assert!((var.sqrt() - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_seeded_reproducible() {
        let mut a = Sampler::seeded(1000, 42);
        let mut b = Sampler::seeded(1000, 42);
        assert_eq!(a.uniform(0.0, 1.0), b.uniform(0.0, 1.0));
        assert_eq!(a.normal(0.0, 1.0), b.normal(0.0, 1.0));
    }

    #[test]
    fn test_permute_preserves_values() {
        let mut sampler = Sampler::seeded(5, 3);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let mut shuffled = sampler.permute(&data);
        shuffled.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(shuffled, data);
    }

    #[test]
    fn test_quantile_median() {
        assert_eq!(quantile(&[3.0, 1.0, 2.0], 0.5), 2.0);
        assert!((quantile(&[1.0, 2.0, 3.0, 4.0], 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_type8() {
        // numpy.quantile([1..=10], 0.25, method="median_unbiased") == 2.9166666...
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((quantile(&data, 0.25) - 2.916_666_666_666_667).abs() < 1e-9);
        assert!((quantile(&data, 0.75) - 8.083_333_333_333_334).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_clamps_at_extremes() {
        let data = [1.0, 2.0, 3.0];
        assert_eq!(quantile(&data, 0.0), 1.0);
        assert_eq!(quantile(&data, 1.0), 3.0);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_tail_probabilities() {
        assert!(tail_probabilities(EvalMethod::WorstCase).is_none());
        let (lo, hi) = tail_probabilities(EvalMethod::Statistical3S).unwrap();
        assert!((lo - 0.001_349_898_031_630_1).abs() < 1e-12);
        assert!((lo + hi - 1.0).abs() < 1e-15);
    }
}
