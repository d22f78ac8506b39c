//! Randomization Module
//!
//! Single seeded source of randomness for the engine: the admission gate,
//! simulated daily returns and time-travel jitter all draw from here, so a
//! fixed seed reproduces a whole run.

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Randomization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomizationConfig {
    /// Fixed seed; entropy when unset
    #[serde(default)]
    pub seed: Option<u64>,

    /// Daily volatility at risk score 50
    #[serde(default = "default_daily_volatility")]
    pub daily_volatility: f64,

    /// Expected daily drift at risk score 50
    #[serde(default = "default_daily_drift")]
    pub daily_drift: f64,

    // Time-travel jitter bounds
    #[serde(default = "default_jitter_min")]
    pub jitter_min: f64,
    #[serde(default = "default_jitter_max")]
    pub jitter_max: f64,
}

fn default_daily_volatility() -> f64 {
    0.01
}

fn default_daily_drift() -> f64 {
    0.0003
}

fn default_jitter_min() -> f64 {
    0.8
}

fn default_jitter_max() -> f64 {
    1.2
}

impl Default for RandomizationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            daily_volatility: default_daily_volatility(),
            daily_drift: default_daily_drift(),
            jitter_min: default_jitter_min(),
            jitter_max: default_jitter_max(),
        }
    }
}

/// Seedable randomness source
pub struct Randomizer {
    config: RandomizationConfig,
    rng: StdRng,
}

impl Randomizer {
    /// Create a new randomizer, seeded from config when a seed is set
    pub fn new(config: RandomizationConfig) -> Self {
        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Create randomizer with an explicit seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(RandomizationConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    /// Decide whether to take an action with given probability
    pub fn should_act(&mut self, probability: f64) -> bool {
        let probability = probability.clamp(0.0, 1.0);
        self.rng.gen::<f64>() < probability
    }

    /// Uniform factor in `[min, max]`
    pub fn factor_between(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    /// Multiplier applied to counterfactual returns
    pub fn time_travel_jitter(&mut self) -> f64 {
        let (min, max) = (self.config.jitter_min, self.config.jitter_max);
        self.factor_between(min, max)
    }

    /// Simulated daily return. Drift and volatility scale with risk score,
    /// so a yolo pilot swings twice as hard as a balanced one.
    pub fn daily_return(&mut self, risk_score: u8) -> f64 {
        let scale = (risk_score as f64 / 50.0).max(0.1);
        let shock = self.rng.gen_range(-1.0..=1.0) * self.config.daily_volatility * scale;
        self.config.daily_drift * scale + shock
    }
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new(RandomizationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_with_seed() {
        let mut r1 = Randomizer::seeded(12345);
        let mut r2 = Randomizer::seeded(12345);

        // Same seed should produce same results
        for _ in 0..10 {
            assert_eq!(r1.daily_return(70), r2.daily_return(70));
        }
    }

    #[test]
    fn test_jitter_range() {
        let mut randomizer = Randomizer::seeded(42);
        for _ in 0..1000 {
            let jitter = randomizer.time_travel_jitter();
            assert!((0.8..=1.2).contains(&jitter));
        }
    }

    #[test]
    fn test_should_act_probability() {
        let mut randomizer = Randomizer::seeded(42);

        let mut hits = 0;
        let iterations = 1000;
        for _ in 0..iterations {
            if randomizer.should_act(0.5) {
                hits += 1;
            }
        }

        // Should be approximately 50% (allow 10% variance)
        let rate = hits as f64 / iterations as f64;
        assert!(rate > 0.4);
        assert!(rate < 0.6);
    }

    #[test]
    fn test_should_act_extremes() {
        let mut randomizer = Randomizer::seeded(7);
        for _ in 0..100 {
            assert!(!randomizer.should_act(0.0));
            assert!(randomizer.should_act(1.0));
        }
    }

    #[test]
    fn test_daily_return_bounded_by_risk() {
        let mut randomizer = Randomizer::seeded(9);
        for _ in 0..500 {
            let calm = randomizer.daily_return(10);
            let wild = randomizer.daily_return(100);
            assert!(calm.abs() <= 0.01 * 0.2 + 0.0003 * 0.2 + 1e-12);
            assert!(wild.abs() <= 0.02 + 0.0006 + 1e-12);
        }
    }
}
