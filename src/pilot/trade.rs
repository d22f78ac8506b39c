//! Trades recorded by the executor
//!
//! A trade is created pending, then executed (or dropped) after the execution
//! delay. Executed trades are immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::PlainEnglishLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    Executed,
    Partial,
    Failed,
}

/// Narration of one trade at every comprehension tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeNarrative {
    pub eli5: String,
    pub beginner: String,
    pub intermediate: String,
    pub advanced: String,
    pub expert: String,
}

impl TradeNarrative {
    pub fn for_level(&self, level: PlainEnglishLevel) -> &str {
        match level {
            PlainEnglishLevel::Eli5 => &self.eli5,
            PlainEnglishLevel::Beginner => &self.beginner,
            PlainEnglishLevel::Intermediate => &self.intermediate,
            PlainEnglishLevel::Advanced => &self.advanced,
            PlainEnglishLevel::Expert => &self.expert,
        }
    }
}

/// Why the engine took the trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReasoning {
    pub signals: Vec<String>,
    /// round(win_rate * 100) of the originating strategy
    pub confidence: u8,
    pub strategy_source: String,
    pub expected_outcome: String,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Monotonic across the engine, in creation order
    pub id: u64,
    pub pilot_id: String,
    pub timestamp: DateTime<Utc>,
    pub strategy_id: String,
    pub asset: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub value: f64,
    pub fees: f64,
    pub net_value: f64,
    pub narrative: TradeNarrative,
    pub reasoning: TradeReasoning,
    #[serde(default)]
    pub educational_tip: Option<String>,
    pub status: TradeStatus,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Unrealized P&L of this trade at `mark_price`
    pub fn mark_to_market(&self, mark_price: f64) -> f64 {
        match self.side {
            TradeSide::Buy => (mark_price - self.price) * self.quantity,
            TradeSide::Sell => (self.price - mark_price) * self.quantity,
        }
    }

    pub fn is_executed(&self) -> bool {
        self.status == TradeStatus::Executed
    }
}

/// Lightweight reference to a trade, used in simulations and summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRef {
    pub trade_id: u64,
    pub asset: String,
    pub side: TradeSide,
    pub value: f64,
    pub pnl: f64,
    pub timestamp: DateTime<Utc>,
}

impl TradeRef {
    pub fn new(trade: &Trade, pnl: f64) -> Self {
        Self {
            trade_id: trade.id,
            asset: trade.asset.clone(),
            side: trade.side,
            value: trade.value,
            pnl,
            timestamp: trade.timestamp,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn trade(id: u64, pilot_id: &str, side: TradeSide, price: f64, quantity: f64) -> Trade {
        let value = price * quantity;
        Trade {
            id,
            pilot_id: pilot_id.to_string(),
            timestamp: Utc::now(),
            strategy_id: "test_strategy".to_string(),
            asset: "AAPL".to_string(),
            side,
            quantity,
            price,
            value,
            fees: 0.0,
            net_value: value,
            narrative: TradeNarrative::default(),
            reasoning: TradeReasoning {
                signals: vec![],
                confidence: 50,
                strategy_source: "test".to_string(),
                expected_outcome: String::new(),
                risks: vec![],
            },
            educational_tip: None,
            status: TradeStatus::Executed,
            executed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::trade;
    use super::*;

    #[test]
    fn test_mark_to_market_by_side() {
        let buy = trade(1, "p", TradeSide::Buy, 100.0, 2.0);
        assert_eq!(buy.mark_to_market(110.0), 20.0);
        assert_eq!(buy.mark_to_market(90.0), -20.0);

        let sell = trade(2, "p", TradeSide::Sell, 100.0, 2.0);
        assert_eq!(sell.mark_to_market(90.0), 20.0);
        assert_eq!(sell.mark_to_market(110.0), -20.0);
    }

    #[test]
    fn test_narrative_tier_lookup() {
        let narrative = TradeNarrative {
            eli5: "a".into(),
            beginner: "b".into(),
            intermediate: "c".into(),
            advanced: "d".into(),
            expert: "e".into(),
        };
        assert_eq!(narrative.for_level(PlainEnglishLevel::Eli5), "a");
        assert_eq!(narrative.for_level(PlainEnglishLevel::Expert), "e");
    }
}
