//! Risk DNA Discovery
//!
//! What a user says about their risk tolerance and how they behave under
//! drawdown are often different. Behavioral counters collected by the engine
//! are turned into a discovered risk tier with a confidence and a short
//! explanation of what drove it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::pilot::{Trade, TradeSide};
use crate::strategy::types::RiskDna;

/// Checks per day tolerated before it counts as anxious monitoring
const CHECKS_PER_DAY_THRESHOLD: f64 = 4.0;
const CHECK_PENALTY: f64 = 5.0;
const MAX_CHECK_PENALTY: f64 = 20.0;
const PANIC_PENALTY: f64 = 15.0;
const MAX_PANIC_PENALTY: f64 = 45.0;
/// Missed opportunities per penalty step
const MISSED_STEP: u32 = 10;
const MISSED_PENALTY: f64 = 5.0;
const MAX_MISSED_PENALTY: f64 = 15.0;
/// Drawdown (percent) sat through that earns the tolerance bonus
const TOLERANCE_THRESHOLD_PCT: f64 = 10.0;
const TOLERANCE_BONUS: f64 = 10.0;
const SHORT_HOLD_HOURS: f64 = 1.0;
const SHORT_HOLD_PENALTY: f64 = 10.0;
/// Trades needed for full behavioral confidence
const FULL_CONFIDENCE_TRADES: f64 = 50.0;

/// Raw behavior collected between learning ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorCounters {
    pub checks: u64,
    pub first_check_at: Option<DateTime<Utc>>,
    /// Pauses or exits requested while the portfolio was under water
    pub panic_sells: u32,
    /// Trading ticks skipped because the pilot was paused
    pub missed_opportunities: u32,
    /// Deepest drawdown (percent, positive) ridden out while active
    pub drawdown_tolerance: f64,
}

impl BehaviorCounters {
    pub fn record_check(&mut self, now: DateTime<Utc>) {
        self.checks += 1;
        self.first_check_at.get_or_insert(now);
    }

    pub fn record_panic(&mut self) {
        self.panic_sells += 1;
    }

    pub fn record_missed(&mut self) {
        self.missed_opportunities = self.missed_opportunities.saturating_add(1);
    }

    /// Track the worst drawdown endured without bailing out
    pub fn observe_drawdown(&mut self, total_return_percent: f64) {
        if total_return_percent < 0.0 {
            self.drawdown_tolerance = self.drawdown_tolerance.max(-total_return_percent);
        }
    }

    /// Average checks per day since the first check. Less than a day counts as one day.
    pub fn checks_per_day(&self, now: DateTime<Utc>) -> f64 {
        match self.first_check_at {
            None => 0.0,
            Some(first) => {
                let days = ((now - first).num_seconds() as f64 / 86_400.0).max(1.0);
                self.checks as f64 / days
            }
        }
    }
}

/// Discovered risk profile for one pilot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDnaDiscovery {
    pub pilot_id: String,
    pub check_frequency: f64,
    pub panic_sells: u32,
    pub missed_opportunities: u32,
    #[serde(default)]
    pub avg_hold_time_hours: Option<f64>,
    pub drawdown_tolerance: f64,
    pub declared_risk: RiskDna,
    pub discovered_risk: RiskDna,
    /// Adjusted score before mapping back to a tier
    pub discovered_score: f64,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub explanation: String,
    pub updated_at: DateTime<Utc>,
}

impl RiskDnaDiscovery {
    /// Whether behavior disagrees with what the user declared
    pub fn diverges(&self) -> bool {
        self.declared_risk != self.discovered_risk
    }
}

/// Inputs to one discovery pass
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryInput<'a> {
    pub pilot_id: &'a str,
    pub declared: RiskDna,
    pub counters: &'a BehaviorCounters,
    pub avg_hold_time_hours: Option<f64>,
    pub total_trades: u64,
    pub now: DateTime<Utc>,
}

/// Score behavior against the declared tier
pub fn discover(input: DiscoveryInput<'_>) -> RiskDnaDiscovery {
    let counters = input.counters;
    let check_frequency = input.counters.checks_per_day(input.now);
    let mut adjustments: Vec<(f64, String)> = Vec::new();

    let excess_checks = (check_frequency - CHECKS_PER_DAY_THRESHOLD).max(0.0).floor();
    if excess_checks > 0.0 {
        adjustments.push((
            -(excess_checks * CHECK_PENALTY).min(MAX_CHECK_PENALTY),
            format!("checking {:.1} times a day", check_frequency),
        ));
    }

    if counters.panic_sells > 0 {
        adjustments.push((
            -(counters.panic_sells as f64 * PANIC_PENALTY).min(MAX_PANIC_PENALTY),
            format!("{} pause(s) during a drawdown", counters.panic_sells),
        ));
    }

    let missed_steps = counters.missed_opportunities / MISSED_STEP;
    if missed_steps > 0 {
        adjustments.push((
            -(missed_steps as f64 * MISSED_PENALTY).min(MAX_MISSED_PENALTY),
            format!("{} missed trading windows while paused", counters.missed_opportunities),
        ));
    }

    if counters.drawdown_tolerance >= TOLERANCE_THRESHOLD_PCT && counters.panic_sells == 0 {
        adjustments.push((
            TOLERANCE_BONUS,
            format!("held through a {:.1}% drawdown", counters.drawdown_tolerance),
        ));
    }

    if let Some(hours) = input.avg_hold_time_hours {
        if hours < SHORT_HOLD_HOURS {
            adjustments.push((
                -SHORT_HOLD_PENALTY,
                format!("average hold of {:.0} minutes", hours * 60.0),
            ));
        }
    }

    let declared_score = input.declared.score() as f64;
    let delta: f64 = adjustments.iter().map(|(d, _)| d).sum();
    let discovered_score = (declared_score + delta).clamp(0.0, 100.0);
    let discovered_risk = RiskDna::from_score(discovered_score);

    let panic_boost = if counters.panic_sells > 0 { 0.1 } else { 0.0 };
    let confidence = (input.total_trades as f64 / FULL_CONFIDENCE_TRADES).min(1.0) * 0.9 + panic_boost;

    RiskDnaDiscovery {
        pilot_id: input.pilot_id.to_string(),
        check_frequency,
        panic_sells: counters.panic_sells,
        missed_opportunities: counters.missed_opportunities,
        avg_hold_time_hours: input.avg_hold_time_hours,
        drawdown_tolerance: counters.drawdown_tolerance,
        declared_risk: input.declared,
        discovered_risk,
        discovered_score,
        confidence,
        explanation: explain(input.declared, discovered_risk, adjustments),
        updated_at: input.now,
    }
}

fn explain(declared: RiskDna, discovered: RiskDna, mut adjustments: Vec<(f64, String)>) -> String {
    if adjustments.is_empty() {
        return format!("Your behavior matches your declared {} profile.", declared);
    }

    // Strongest signals first
    adjustments.sort_by(|a, b| b.0.abs().total_cmp(&a.0.abs()));
    let reasons: Vec<String> = adjustments
        .into_iter()
        .map(|(delta, reason)| format!("{} ({:+.0})", reason, delta))
        .collect();

    if declared == discovered {
        format!(
            "Still {} after adjusting for: {}.",
            discovered,
            reasons.join("; ")
        )
    } else {
        format!(
            "You declared {} but behave like {}: {}.",
            declared,
            discovered,
            reasons.join("; ")
        )
    }
}

/// Mean time between a buy and the sell that closes it, per asset in FIFO order
pub fn average_hold_hours(trades: &[Trade]) -> Option<f64> {
    let mut ordered: Vec<&Trade> = trades.iter().filter(|t| t.is_executed()).collect();
    ordered.sort_by_key(|t| (t.timestamp, t.id));

    let mut open: HashMap<&str, VecDeque<DateTime<Utc>>> = HashMap::new();
    let mut total_hours = 0.0;
    let mut closed = 0u32;

    for trade in ordered {
        match trade.side {
            TradeSide::Buy => open.entry(trade.asset.as_str()).or_default().push_back(trade.timestamp),
            TradeSide::Sell => {
                if let Some(opened) = open.get_mut(trade.asset.as_str()).and_then(|q| q.pop_front()) {
                    total_hours += (trade.timestamp - opened).num_seconds() as f64 / 3600.0;
                    closed += 1;
                }
            }
        }
    }

    if closed == 0 {
        None
    } else {
        Some(total_hours / closed as f64)
    }
}
