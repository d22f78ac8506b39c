//! Time-Travel Simulator
//!
//! "What if you'd started earlier?" Projects the pilot's deposits over a past
//! window using a fixed annualized return for its risk tier, scaled by a
//! bounded random jitter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::pilot::{Pilot, Trade, TradeRef};
use crate::strategy::types::RiskDna;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeTravelScenario {
    LastMonth,
    LastQuarter,
    LastYear,
    Custom,
}

impl TimeTravelScenario {
    /// Window length for preset scenarios
    pub fn days(self) -> Option<i64> {
        match self {
            TimeTravelScenario::LastMonth => Some(30),
            TimeTravelScenario::LastQuarter => Some(90),
            TimeTravelScenario::LastYear => Some(365),
            TimeTravelScenario::Custom => None,
        }
    }
}

impl fmt::Display for TimeTravelScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeTravelScenario::LastMonth => write!(f, "last_month"),
            TimeTravelScenario::LastQuarter => write!(f, "last_quarter"),
            TimeTravelScenario::LastYear => write!(f, "last_year"),
            TimeTravelScenario::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for TimeTravelScenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_month" => Ok(TimeTravelScenario::LastMonth),
            "last_quarter" => Ok(TimeTravelScenario::LastQuarter),
            "last_year" => Ok(TimeTravelScenario::LastYear),
            "custom" => Ok(TimeTravelScenario::Custom),
            other => Err(Error::InvalidInput(format!("unknown scenario: {}", other))),
        }
    }
}

/// Annualized return assumed for each risk tier
pub fn base_annual_return(risk: RiskDna) -> f64 {
    match risk {
        RiskDna::UltraSafe => 0.04,
        RiskDna::Careful => 0.06,
        RiskDna::Balanced => 0.09,
        RiskDna::Growth => 0.14,
        RiskDna::Aggressive => 0.20,
        RiskDna::Yolo => 0.35,
    }
}

/// Start of the simulated window. Custom scenarios need a start date in the past.
pub fn resolve_start(
    scenario: TimeTravelScenario,
    custom_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    match scenario.days() {
        Some(days) => Ok(now - Duration::days(days)),
        None => match custom_start {
            Some(start) if start < now => Ok(start),
            Some(start) => Err(Error::InvalidInput(format!(
                "custom start date {} is not in the past",
                start.to_rfc3339()
            ))),
            None => Err(Error::InvalidInput(
                "custom scenario requires a start date".to_string(),
            )),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTravelResult {
    pub pilot_id: String,
    pub scenario: TimeTravelScenario,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days: i64,
    pub risk_dna: RiskDna,
    pub base_annual_return: f64,
    pub jitter: f64,
    pub hypothetical_value: f64,
    pub hypothetical_return: f64,
    pub hypothetical_return_percent: f64,
    pub actual_value: f64,
    pub best_trade: Option<TradeRef>,
    pub worst_trade: Option<TradeRef>,
}

/// Inputs gathered by the engine before simulating
#[derive(Debug, Clone, Copy)]
pub struct TimeTravelInput<'a> {
    pub scenario: TimeTravelScenario,
    pub start: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub jitter: f64,
    pub trades: &'a [Trade],
    pub quotes: &'a HashMap<String, f64>,
}

pub fn simulate(pilot: &Pilot, input: TimeTravelInput<'_>) -> TimeTravelResult {
    let elapsed = input.now - input.start;
    let years = elapsed.num_seconds().max(0) as f64 / (365.0 * 86_400.0);
    let base = base_annual_return(pilot.risk_dna);

    let hypothetical_return = pilot.total_deposited * base * years * input.jitter;
    let hypothetical_return_percent = if pilot.total_deposited > 0.0 {
        hypothetical_return / pilot.total_deposited * 100.0
    } else {
        0.0
    };

    // Trades inside the window, marked against current quotes
    let marked: Vec<TradeRef> = input
        .trades
        .iter()
        .filter(|t| t.is_executed() && t.timestamp >= input.start)
        .filter_map(|t| {
            let price = input.quotes.get(&t.asset)?;
            Some(TradeRef::new(t, t.mark_to_market(*price)))
        })
        .collect();
    let best_trade = marked.iter().max_by(|a, b| a.pnl.total_cmp(&b.pnl)).cloned();
    let worst_trade = marked.iter().min_by(|a, b| a.pnl.total_cmp(&b.pnl)).cloned();

    TimeTravelResult {
        pilot_id: pilot.id.clone(),
        scenario: input.scenario,
        start_date: input.start,
        end_date: input.now,
        days: elapsed.num_days(),
        risk_dna: pilot.risk_dna,
        base_annual_return: base,
        jitter: input.jitter,
        hypothetical_value: pilot.total_deposited + hypothetical_return,
        hypothetical_return,
        hypothetical_return_percent,
        actual_value: pilot.current_value,
        best_trade,
        worst_trade,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::trade::fixtures::trade;
    use crate::pilot::{PilotPreferences, TradeSide};

    #[test]
    fn test_preset_windows() {
        let now = Utc::now();
        let start = resolve_start(TimeTravelScenario::LastQuarter, None, now).unwrap();
        assert_eq!((now - start).num_days(), 90);
        let start = resolve_start(TimeTravelScenario::LastYear, Some(now), now).unwrap();
        assert_eq!((now - start).num_days(), 365);
    }

    #[test]
    fn test_custom_requires_past_date() {
        let now = Utc::now();
        assert!(matches!(
            resolve_start(TimeTravelScenario::Custom, None, now),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            resolve_start(TimeTravelScenario::Custom, Some(now + Duration::days(1)), now),
            Err(Error::InvalidInput(_))
        ));
        let past = now - Duration::days(10);
        assert_eq!(
            resolve_start(TimeTravelScenario::Custom, Some(past), now).unwrap(),
            past
        );
    }

    #[test]
    fn test_year_projection() {
        let pilot = Pilot::new(
            "u",
            1000.0,
            &PilotPreferences::default().with_risk(RiskDna::Aggressive),
        );
        let now = Utc::now();
        let quotes = HashMap::new();
        let result = simulate(
            &pilot,
            TimeTravelInput {
                scenario: TimeTravelScenario::LastYear,
                start: now - Duration::days(365),
                now,
                jitter: 1.0,
                trades: &[],
                quotes: &quotes,
            },
        );
        assert!((result.hypothetical_return - 200.0).abs() < 1e-6);
        assert!((result.hypothetical_value - 1200.0).abs() < 1e-6);
        assert!((result.hypothetical_return_percent - 20.0).abs() < 1e-6);
        assert_eq!(result.days, 365);
        assert!(result.best_trade.is_none());
    }

    #[test]
    fn test_best_and_worst_trades() {
        let pilot = Pilot::new("u", 1000.0, &PilotPreferences::default());
        let now = Utc::now();
        let trades = vec![
            trade(1, &pilot.id, TradeSide::Buy, 100.0, 1.0),
            trade(2, &pilot.id, TradeSide::Buy, 140.0, 1.0),
            trade(3, &pilot.id, TradeSide::Sell, 150.0, 1.0),
        ];
        let quotes = HashMap::from([("AAPL".to_string(), 120.0)]);
        let result = simulate(
            &pilot,
            TimeTravelInput {
                scenario: TimeTravelScenario::LastMonth,
                start: now - Duration::days(30),
                now,
                jitter: 0.9,
                trades: &trades,
                quotes: &quotes,
            },
        );
        assert_eq!(result.best_trade.unwrap().trade_id, 3);
        assert_eq!(result.worst_trade.unwrap().trade_id, 2);
    }

    #[test]
    fn test_scenario_parse() {
        assert_eq!(
            "last_month".parse::<TimeTravelScenario>().unwrap(),
            TimeTravelScenario::LastMonth
        );
        assert!("next_year".parse::<TimeTravelScenario>().is_err());
    }
}
