//! Admission gate
//!
//! Decides whether a ranked strategy produces a trade candidate this cycle.
//! The gate is the only non-deterministic step in the trading cycle, so it
//! sits behind the `SignalEvaluator` trait and can be swapped in tests.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::randomization::Randomizer;
use super::types::Strategy;
use crate::pilot::{Pilot, TradeSide};

/// Outcome of evaluating a strategy's signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDecision {
    Accept { side: TradeSide },
    Reject,
}

impl SignalDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, SignalDecision::Accept { .. })
    }
}

/// Trait for admission decision sources
///
/// The probabilistic evaluator is a placeholder for real market-signal
/// evaluation; implementations backed by live data plug in here.
#[async_trait]
pub trait SignalEvaluator: Send + Sync {
    /// Evaluator name for logging
    fn name(&self) -> &'static str;

    /// Decide whether `strategy` fires for `pilot` right now
    async fn evaluate(&self, strategy: &Strategy, pilot: &Pilot) -> SignalDecision;
}

/// Probability that a strategy's signal converts into a candidate
pub fn admission_probability(strategy: &Strategy, admission_factor: f64) -> f64 {
    (strategy.win_rate * admission_factor).clamp(0.0, 1.0)
}

/// Accepts with probability `win_rate * admission_factor`
pub struct ProbabilisticSignalEvaluator {
    admission_factor: f64,
    buy_bias: f64,
    randomizer: Arc<Mutex<Randomizer>>,
}

impl ProbabilisticSignalEvaluator {
    pub fn new(admission_factor: f64, buy_bias: f64, randomizer: Arc<Mutex<Randomizer>>) -> Self {
        Self {
            admission_factor,
            buy_bias,
            randomizer,
        }
    }
}

#[async_trait]
impl SignalEvaluator for ProbabilisticSignalEvaluator {
    fn name(&self) -> &'static str {
        "probabilistic"
    }

    async fn evaluate(&self, strategy: &Strategy, _pilot: &Pilot) -> SignalDecision {
        let probability = admission_probability(strategy, self.admission_factor);
        let mut rng = self.randomizer.lock().await;
        if !rng.should_act(probability) {
            return SignalDecision::Reject;
        }
        let side = if rng.should_act(self.buy_bias) {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };
        SignalDecision::Accept { side }
    }
}

/// Always returns the same decision. Used for dry runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSignalEvaluator {
    decision: SignalDecision,
}

impl FixedSignalEvaluator {
    pub fn always(side: TradeSide) -> Self {
        Self {
            decision: SignalDecision::Accept { side },
        }
    }

    pub fn never() -> Self {
        Self {
            decision: SignalDecision::Reject,
        }
    }
}

#[async_trait]
impl SignalEvaluator for FixedSignalEvaluator {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn evaluate(&self, _strategy: &Strategy, _pilot: &Pilot) -> SignalDecision {
        self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::PilotPreferences;
    use crate::strategy::catalog::StrategyCatalog;

    #[test]
    fn test_admission_probability() {
        let catalog = StrategyCatalog::builtin();
        let strategy = catalog.get("crypto_momentum").unwrap();
        assert!((admission_probability(strategy, 0.1) - 0.052).abs() < 1e-12);
        assert_eq!(admission_probability(strategy, 5.0), 1.0);
    }

    #[tokio::test]
    async fn test_probabilistic_rate_tracks_win_rate() {
        let catalog = StrategyCatalog::builtin();
        let strategy = catalog.get("treasury_ladder").unwrap();
        let pilot = Pilot::new("u", 1000.0, &PilotPreferences::default());
        let evaluator =
            ProbabilisticSignalEvaluator::new(0.5, 0.5, Arc::new(Mutex::new(Randomizer::seeded(1))));

        let mut accepted = 0;
        for _ in 0..2000 {
            if evaluator.evaluate(strategy, &pilot).await.is_accept() {
                accepted += 1;
            }
        }
        // 0.92 * 0.5 = 0.46
        let rate = accepted as f64 / 2000.0;
        assert!(rate > 0.40 && rate < 0.52, "rate {}", rate);
    }

    #[tokio::test]
    async fn test_fixed_evaluator() {
        let catalog = StrategyCatalog::builtin();
        let strategy = &catalog.all()[0];
        let pilot = Pilot::new("u", 1000.0, &PilotPreferences::default());

        let always = FixedSignalEvaluator::always(TradeSide::Sell);
        assert_eq!(
            always.evaluate(strategy, &pilot).await,
            SignalDecision::Accept {
                side: TradeSide::Sell
            }
        );
        assert_eq!(
            FixedSignalEvaluator::never().evaluate(strategy, &pilot).await,
            SignalDecision::Reject
        );
    }
}
