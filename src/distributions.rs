//! Random-variate samplers supplied to generators.
//!
//! Each sampler exposes a single operation drawing the next value from the
//! simulation-wide deterministic RNG; the samplers themselves carry no RNG
//! state, so one sampler can be shared across generators without breaking
//! replay.

use rand::Rng;
use rand_pcg::Pcg64;

/// A source of one stream of random variates.
pub trait Sampler {
    /// Draws the next value.
    fn sample(&self, rng: &mut Pcg64) -> f64;
}

/// Always returns the same value.
pub struct Deterministic {
    value: f64,
}

impl Deterministic {
    /// Creates a constant sampler.
    pub fn new(value: f64) -> Self {
        assert!(value >= 0.0, "deterministic variate must be non-negative");
        Self { value }
    }
}

impl Sampler for Deterministic {
    fn sample(&self, _rng: &mut Pcg64) -> f64 {
        self.value
    }
}

/// Exponential distribution with the given rate (mean `1 / rate`).
pub struct Exponential {
    dist: rand_distr::Exp<f64>,
}

impl Exponential {
    /// Creates an exponential sampler; the rate must be positive.
    pub fn new(rate: f64) -> Self {
        Self {
            dist: rand_distr::Exp::new(rate).expect("exponential rate must be positive"),
        }
    }
}

impl Sampler for Exponential {
    fn sample(&self, rng: &mut Pcg64) -> f64 {
        rng.sample(&self.dist)
    }
}

/// Log-normal distribution parameterized by the underlying normal's mu and
/// sigma.
pub struct LogNormal {
    dist: rand_distr::LogNormal<f64>,
}

impl LogNormal {
    /// Creates a log-normal sampler; sigma must be non-negative.
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self {
            dist: rand_distr::LogNormal::new(mu, sigma).expect("invalid log-normal parameters"),
        }
    }
}

impl Sampler for LogNormal {
    fn sample(&self, rng: &mut Pcg64) -> f64 {
        rng.sample(&self.dist)
    }
}

/// Two-point distribution: `low` with probability `ratio`, `high` otherwise.
pub struct Bimodal {
    low: f64,
    high: f64,
    ratio: f64,
}

impl Bimodal {
    /// Creates a bimodal sampler; `ratio` is the probability of `low`.
    pub fn new(low: f64, high: f64, ratio: f64) -> Self {
        assert!((0.0..=1.0).contains(&ratio), "bimodal ratio must be in [0, 1]");
        Self { low, high, ratio }
    }
}

impl Sampler for Bimodal {
    fn sample(&self, rng: &mut Pcg64) -> f64 {
        if rng.gen::<f64>() > self.ratio {
            self.high
        } else {
            self.low
        }
    }
}

/// Uniform distribution over `0..n`, returned as a float index.
pub struct UniformIndex {
    n: usize,
}

impl UniformIndex {
    /// Creates a uniform index sampler over `n` elements.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "uniform index needs at least one element");
        Self { n }
    }
}

impl Sampler for UniformIndex {
    fn sample(&self, rng: &mut Pcg64) -> f64 {
        rng.gen_range(0..self.n) as f64
    }
}

/// Zipf distribution over `0..n`, returned as a float index.
///
/// Used as a skewed selector, e.g. to pick hot cowns more often.
pub struct Zipf {
    dist: rand_distr::Zipf<f64>,
}

impl Zipf {
    /// Creates a Zipf sampler over `n` elements with exponent `s`.
    pub fn new(n: u64, s: f64) -> Self {
        Self {
            dist: rand_distr::Zipf::new(n, s).expect("invalid zipf parameters"),
        }
    }
}

impl Sampler for Zipf {
    fn sample(&self, rng: &mut Pcg64) -> f64 {
        // rand_distr yields ranks in 1..=n; shift to a 0-based index.
        rng.sample(&self.dist) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn deterministic_is_constant() {
        let mut rng = Pcg64::seed_from_u64(7);
        let d = Deterministic::new(3.5);
        for _ in 0..10 {
            assert_eq!(d.sample(&mut rng), 3.5);
        }
    }

    #[test]
    fn bimodal_yields_only_its_two_values() {
        let mut rng = Pcg64::seed_from_u64(7);
        let d = Bimodal::new(1.0, 10.0, 0.9);
        for _ in 0..1000 {
            let v = d.sample(&mut rng);
            assert!(v == 1.0 || v == 10.0);
        }
    }

    #[test]
    fn zipf_indices_stay_in_range() {
        let mut rng = Pcg64::seed_from_u64(7);
        let d = Zipf::new(16, 2.0);
        for _ in 0..1000 {
            let v = d.sample(&mut rng);
            assert!((0.0..16.0).contains(&v));
        }
    }
}
