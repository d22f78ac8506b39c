//! Exit-Ramp Controller
//!
//! Graceful wind-down of a pilot. Starting an exit stops trading at once and
//! cancels anything pending; closing it out is a separate, explicit step.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::pilot::{Pilot, PilotState, PilotStatus, Trade};

/// Flat share of current value assumed saved by tax-aware unwinding
pub const TAX_SAVINGS_RATE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStrategy {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "gradual_1week")]
    Gradual1Week,
    #[serde(rename = "gradual_1month")]
    Gradual1Month,
    #[serde(rename = "optimal")]
    Optimal,
}

impl ExitStrategy {
    pub fn offset_days(self) -> i64 {
        match self {
            ExitStrategy::Immediate => 0,
            ExitStrategy::Gradual1Week => 7,
            ExitStrategy::Gradual1Month => 30,
            ExitStrategy::Optimal => 14,
        }
    }

    pub fn is_tax_optimized(self) -> bool {
        self != ExitStrategy::Immediate
    }
}

impl fmt::Display for ExitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStrategy::Immediate => write!(f, "immediate"),
            ExitStrategy::Gradual1Week => write!(f, "gradual_1week"),
            ExitStrategy::Gradual1Month => write!(f, "gradual_1month"),
            ExitStrategy::Optimal => write!(f, "optimal"),
        }
    }
}

impl FromStr for ExitStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "immediate" => Ok(ExitStrategy::Immediate),
            "gradual_1week" => Ok(ExitStrategy::Gradual1Week),
            "gradual_1month" => Ok(ExitStrategy::Gradual1Month),
            "optimal" => Ok(ExitStrategy::Optimal),
            other => Err(Error::InvalidInput(format!("unknown exit strategy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRamp {
    pub pilot_id: String,
    pub requested_at: DateTime<Utc>,
    pub target_exit_date: DateTime<Utc>,
    pub strategy: ExitStrategy,
    pub positions_total: usize,
    pub positions_closed: usize,
    pub percent_complete: f64,
    pub tax_optimized: bool,
    pub estimated_tax_savings: f64,
    pub projected_final_value: f64,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExitRamp {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Mark every position closed
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.positions_closed = self.positions_total;
        self.percent_complete = 100.0;
        self.completed_at = Some(now);
    }
}

/// Compute the exit plan for a pilot. Does not touch pilot state.
pub fn plan_exit(pilot: &Pilot, strategy: ExitStrategy, trades: &[Trade], now: DateTime<Utc>) -> ExitRamp {
    let positions_total = trades
        .iter()
        .filter(|t| t.is_executed())
        .map(|t| t.asset.as_str())
        .collect::<HashSet<_>>()
        .len();

    let tax_optimized = strategy.is_tax_optimized();
    let estimated_tax_savings = if tax_optimized {
        pilot.current_value * TAX_SAVINGS_RATE
    } else {
        0.0
    };

    ExitRamp {
        pilot_id: pilot.id.clone(),
        requested_at: now,
        target_exit_date: now + Duration::days(strategy.offset_days()),
        strategy,
        positions_total,
        positions_closed: 0,
        percent_complete: 0.0,
        tax_optimized,
        estimated_tax_savings,
        projected_final_value: pilot.current_value + estimated_tax_savings,
        completed_at: None,
    }
}

/// Move a pilot into the exiting state. Returns the ramp and the pending
/// trades that were cancelled.
pub fn begin_exit(
    state: &mut PilotState,
    strategy: ExitStrategy,
    trades: &[Trade],
    now: DateTime<Utc>,
) -> Result<(ExitRamp, Vec<Trade>)> {
    match state.pilot.status {
        PilotStatus::Exiting => {
            return Err(Error::invalid_state(&state.pilot.id, "exit already in progress"))
        }
        PilotStatus::Closed => return Err(Error::invalid_state(&state.pilot.id, "pilot is closed")),
        PilotStatus::Active | PilotStatus::Paused => {}
    }

    // Bailing out at a loss counts against discovered risk
    if state.pilot.total_return_percent < 0.0 {
        state.behavior.record_panic();
    }

    state.pilot.transition(PilotStatus::Exiting)?;
    state.pilot.autopilot_enabled = false;
    let cancelled = state.watch.drain_pending();

    let ramp = plan_exit(&state.pilot, strategy, trades, now);
    state.watch.comment(
        None,
        format!(
            "Exit ramp started ({}); target exit {}",
            strategy,
            ramp.target_exit_date.format("%Y-%m-%d")
        ),
    );
    state.exit_ramp = Some(ramp.clone());
    Ok((ramp, cancelled))
}

/// Close out an exiting pilot
pub fn finish_exit(state: &mut PilotState, now: DateTime<Utc>) -> Result<ExitRamp> {
    if state.pilot.status != PilotStatus::Exiting {
        return Err(Error::invalid_state(
            &state.pilot.id,
            format!("cannot complete exit from {}", state.pilot.status),
        ));
    }
    let ramp = state
        .exit_ramp
        .as_mut()
        .ok_or_else(|| Error::invalid_state(&state.pilot.id, "no exit ramp recorded"))?;
    ramp.complete(now);
    let ramp = ramp.clone();

    state.pilot.transition(PilotStatus::Closed)?;
    state.watch.comment(None, "Exit complete; pilot closed");
    Ok(ramp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::trade::fixtures::trade;
    use crate::pilot::{PilotPreferences, TradeSide};

    fn state() -> PilotState {
        PilotState::new(Pilot::new("u", 1000.0, &PilotPreferences::default()), 20, 100)
    }

    #[test]
    fn test_offsets() {
        assert_eq!(ExitStrategy::Immediate.offset_days(), 0);
        assert_eq!(ExitStrategy::Gradual1Week.offset_days(), 7);
        assert_eq!(ExitStrategy::Gradual1Month.offset_days(), 30);
        assert_eq!(ExitStrategy::Optimal.offset_days(), 14);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&ExitStrategy::Gradual1Week).unwrap(),
            r#""gradual_1week""#
        );
        let parsed: ExitStrategy = serde_json::from_str(r#""gradual_1month""#).unwrap();
        assert_eq!(parsed, ExitStrategy::Gradual1Month);
    }

    #[test]
    fn test_plan_counts_distinct_assets() {
        let pilot = Pilot::new("u", 1000.0, &PilotPreferences::default());
        let mut other = trade(3, &pilot.id, TradeSide::Buy, 10.0, 1.0);
        other.asset = "BTC".to_string();
        let trades = vec![
            trade(1, &pilot.id, TradeSide::Buy, 10.0, 1.0),
            trade(2, &pilot.id, TradeSide::Sell, 10.0, 1.0),
            other,
        ];
        let now = Utc::now();
        let ramp = plan_exit(&pilot, ExitStrategy::Optimal, &trades, now);
        assert_eq!(ramp.positions_total, 2);
        assert!(ramp.tax_optimized);
        assert!((ramp.estimated_tax_savings - 20.0).abs() < 1e-9);
        assert!((ramp.projected_final_value - 1020.0).abs() < 1e-9);
        assert_eq!(ramp.target_exit_date, now + Duration::days(14));
    }

    #[test]
    fn test_immediate_has_no_savings() {
        let pilot = Pilot::new("u", 1000.0, &PilotPreferences::default());
        let ramp = plan_exit(&pilot, ExitStrategy::Immediate, &[], Utc::now());
        assert!(!ramp.tax_optimized);
        assert_eq!(ramp.estimated_tax_savings, 0.0);
        assert_eq!(ramp.projected_final_value, 1000.0);
        assert_eq!(ramp.target_exit_date, ramp.requested_at);
    }

    #[test]
    fn test_begin_exit_cancels_pending() {
        let mut state = state();
        let id = state.pilot.id.clone();
        state.watch.queue(trade(9, &id, TradeSide::Buy, 10.0, 1.0));

        let (ramp, cancelled) = begin_exit(&mut state, ExitStrategy::Gradual1Week, &[], Utc::now()).unwrap();
        assert_eq!(cancelled.len(), 1);
        assert!(state.watch.pending_trades.is_empty());
        assert_eq!(state.pilot.status, PilotStatus::Exiting);
        assert!(!state.pilot.autopilot_enabled);
        assert_eq!(state.exit_ramp.as_ref(), Some(&ramp));
    }

    #[test]
    fn test_begin_exit_twice_rejected() {
        let mut state = state();
        begin_exit(&mut state, ExitStrategy::Immediate, &[], Utc::now()).unwrap();
        let err = begin_exit(&mut state, ExitStrategy::Immediate, &[], Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_finish_exit() {
        let mut state = state();
        assert!(finish_exit(&mut state, Utc::now()).is_err());

        begin_exit(&mut state, ExitStrategy::Optimal, &[], Utc::now()).unwrap();
        let ramp = finish_exit(&mut state, Utc::now()).unwrap();
        assert!(ramp.is_complete());
        assert_eq!(ramp.percent_complete, 100.0);
        assert_eq!(state.pilot.status, PilotStatus::Closed);

        let err = finish_exit(&mut state, Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_exit_under_water_counts_as_panic() {
        let mut state = state();
        state.pilot.apply_day_return(-0.1);
        begin_exit(&mut state, ExitStrategy::Immediate, &[], Utc::now()).unwrap();
        assert_eq!(state.behavior.panic_sells, 1);
    }
}
