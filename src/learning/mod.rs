//! Learning & Risk-Discovery Loop
//!
//! On each learning tick a pilot with enough trading history gets:
//! - a refreshed win rate (mark-to-market against current quotes)
//! - the day's return applied to its capital, plus a performance point
//! - a new `RiskDnaDiscovery` from its behavioral counters
//!
//! `apply_learning` is the pure part; the engine gathers trades, quotes and
//! the day's return first, then calls it under the pilot lock.

pub mod discovery;
pub mod returns;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pilot::{PerformancePoint, PilotState, PilotStatus, Trade};
use crate::strategy::types::RiskDna;

pub use discovery::{average_hold_hours, discover, BehaviorCounters, DiscoveryInput, RiskDnaDiscovery};
pub use returns::{FixedReturnModel, ReturnModel, SimulatedReturnModel};

/// Learning loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Pilots with fewer executed trades are left alone
    #[serde(default = "default_min_trades")]
    pub min_trades: u64,

    /// Performance points kept per pilot
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_min_trades() -> u64 {
    5
}

fn default_history_capacity() -> usize {
    365
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_trades: default_min_trades(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// What one learning pass changed on a pilot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningOutcome {
    pub pilot_id: String,
    pub win_rate: f64,
    pub day_return: f64,
    pub current_value: f64,
    pub discovered_risk: RiskDna,
    pub confidence: f64,
}

/// Count trades that are in profit at the given quotes
pub fn count_wins(trades: &[Trade], quotes: &HashMap<String, f64>) -> u64 {
    trades
        .iter()
        .filter(|t| t.is_executed())
        .filter(|t| {
            quotes
                .get(&t.asset)
                .map(|price| t.mark_to_market(*price) > 0.0)
                .unwrap_or(false)
        })
        .count() as u64
}

/// Run one learning step for a pilot. Returns `None` when the pilot is
/// closed or has fewer than `min_trades` trades.
pub fn apply_learning(
    state: &mut PilotState,
    trades: &[Trade],
    quotes: &HashMap<String, f64>,
    day_return: f64,
    config: &LearningConfig,
    now: DateTime<Utc>,
) -> Option<LearningOutcome> {
    if state.pilot.status == PilotStatus::Closed || state.pilot.total_trades < config.min_trades {
        return None;
    }

    let wins = count_wins(trades, quotes);
    state.pilot.win_rate = wins as f64 / state.pilot.total_trades as f64;
    state.pilot.apply_day_return(day_return);

    if state.pilot.status == PilotStatus::Active {
        state.behavior.observe_drawdown(state.pilot.total_return_percent);
    }

    let point = PerformancePoint::capture(&state.pilot, day_return, now);
    state.push_history(point, config.history_capacity);

    let found = discover(DiscoveryInput {
        pilot_id: &state.pilot.id,
        declared: state.pilot.risk_dna,
        counters: &state.behavior,
        avg_hold_time_hours: average_hold_hours(trades),
        total_trades: state.pilot.total_trades,
        now,
    });

    let outcome = LearningOutcome {
        pilot_id: state.pilot.id.clone(),
        win_rate: state.pilot.win_rate,
        day_return,
        current_value: state.pilot.current_value,
        discovered_risk: found.discovered_risk,
        confidence: found.confidence,
    };
    state.discovery = Some(found);
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::trade::fixtures::trade;
    use crate::pilot::{Pilot, PilotPreferences, TradeSide};

    fn state_with_trades(count: u64) -> PilotState {
        let mut pilot = Pilot::new("u", 1000.0, &PilotPreferences::default());
        pilot.total_trades = count;
        PilotState::new(pilot, 20, 100)
    }

    #[test]
    fn test_below_min_trades_untouched() {
        let mut state = state_with_trades(4);
        let before = state.pilot.clone();
        let outcome = apply_learning(
            &mut state,
            &[],
            &HashMap::new(),
            0.05,
            &LearningConfig::default(),
            Utc::now(),
        );
        assert!(outcome.is_none());
        assert_eq!(state.pilot, before);
        assert!(state.history.is_empty());
        assert!(state.discovery.is_none());
    }

    #[test]
    fn test_win_rate_and_capital_update() {
        let mut state = state_with_trades(4);
        let id = state.pilot.id.clone();
        let trades: Vec<Trade> = vec![
            trade(1, &id, TradeSide::Buy, 100.0, 1.0),
            trade(2, &id, TradeSide::Buy, 200.0, 1.0),
            trade(3, &id, TradeSide::Sell, 200.0, 1.0),
            trade(4, &id, TradeSide::Sell, 100.0, 1.0),
        ];
        state.pilot.total_trades = 5;
        let quotes = HashMap::from([("AAPL".to_string(), 150.0)]);

        let outcome = apply_learning(
            &mut state,
            &trades,
            &quotes,
            0.02,
            &LearningConfig::default(),
            Utc::now(),
        )
        .unwrap();

        // buy@100 and sell@200 are winners at 150
        assert!((outcome.win_rate - 0.4).abs() < 1e-9);
        assert!((state.pilot.current_value - 1020.0).abs() < 1e-9);
        assert!((state.pilot.total_return_percent - 2.0).abs() < 1e-9);
        assert_eq!(state.history.len(), 1);
        assert!(state.discovery.is_some());
    }

    #[test]
    fn test_drawdown_recorded_while_active() {
        let mut state = state_with_trades(5);
        apply_learning(
            &mut state,
            &[],
            &HashMap::new(),
            -0.15,
            &LearningConfig::default(),
            Utc::now(),
        );
        assert!((state.behavior.drawdown_tolerance - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_pilot_skipped() {
        let mut state = state_with_trades(10);
        state.pilot.transition(PilotStatus::Exiting).unwrap();
        state.pilot.transition(PilotStatus::Closed).unwrap();
        assert!(apply_learning(
            &mut state,
            &[],
            &HashMap::new(),
            0.01,
            &LearningConfig::default(),
            Utc::now(),
        )
        .is_none());
    }
}
