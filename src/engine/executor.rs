//! Trade Executor
//!
//! Builds pending trades from an admitted strategy: size, fees, reasoning and
//! narration. Execution itself (the delay and re-validation) lives in the
//! trading cycle; this module only shapes the records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::narrative::ExplanationGenerator;
use crate::oracle::Quote;
use crate::pilot::{Pilot, Trade, TradeNarrative, TradeReasoning, TradeSide, TradeStatus};
use crate::strategy::sizing::{PositionSizer, PositionSizingConfig, SizeExplanation, SizingContext};
use crate::strategy::types::{AssetClass, Strategy};

/// Trading cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Ranked strategies considered per pilot per cycle
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Scales a strategy's win rate into its admission probability
    #[serde(default = "default_admission_factor")]
    pub admission_factor: f64,

    /// Probability an admitted signal is a buy
    #[serde(default = "default_buy_bias")]
    pub buy_bias: f64,

    #[serde(default = "default_max_trades_per_cycle")]
    pub max_trades_per_cycle: usize,

    /// Fee charged on notional
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,

    #[serde(default)]
    pub sizing: PositionSizingConfig,
}

fn default_top_n() -> usize {
    10
}

fn default_admission_factor() -> f64 {
    0.1
}

fn default_buy_bias() -> f64 {
    0.6
}

fn default_max_trades_per_cycle() -> usize {
    1
}

fn default_fee_rate() -> f64 {
    0.001
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            admission_factor: default_admission_factor(),
            buy_bias: default_buy_bias(),
            max_trades_per_cycle: default_max_trades_per_cycle(),
            fee_rate: default_fee_rate(),
            sizing: PositionSizingConfig::default(),
        }
    }
}

/// Turns admitted signals into pending trades
#[derive(Debug, Clone)]
pub struct TradeExecutor {
    config: TradingConfig,
    sizer: PositionSizer,
    narrator: ExplanationGenerator,
}

impl TradeExecutor {
    pub fn new(config: TradingConfig) -> Self {
        let sizer = PositionSizer::new(config.sizing.clone());
        Self {
            config,
            sizer,
            narrator: ExplanationGenerator::new(),
        }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// Sizing breakdown for the pilot's next trade. `final_size` is `None`
    /// when the portfolio is too small to trade.
    pub fn explain_size(&self, pilot: &Pilot) -> SizeExplanation {
        self.sizer.explain_size(&SizingContext {
            current_value: pilot.current_value,
            risk_score: pilot.risk_score,
        })
    }

    /// Build a pending trade. `quote.price` must be positive.
    #[allow(clippy::too_many_arguments)]
    pub fn build_pending(
        &self,
        id: u64,
        pilot: &Pilot,
        strategy: &Strategy,
        side: TradeSide,
        quote: &Quote,
        value: f64,
        now: DateTime<Utc>,
    ) -> Trade {
        let fees = value * self.config.fee_rate;
        let mut trade = Trade {
            id,
            pilot_id: pilot.id.clone(),
            timestamp: now,
            strategy_id: strategy.id.clone(),
            asset: quote.symbol.clone(),
            side,
            quantity: value / quote.price,
            price: quote.price,
            value,
            fees,
            net_value: value - fees,
            narrative: TradeNarrative::default(),
            reasoning: reasoning(strategy, quote.asset_class),
            educational_tip: Some(self.narrator.educational_tip(strategy.strategy_type).to_string()),
            status: TradeStatus::Pending,
            executed_at: None,
        };
        trade.narrative = self.narrator.explain(strategy, &quote.symbol, &trade);
        trade
    }
}

fn reasoning(strategy: &Strategy, class: AssetClass) -> TradeReasoning {
    let mut risks = vec![
        format!(
            "Historical drawdown reached {:.0}%",
            strategy.max_drawdown * 100.0
        ),
        format!(
            "Loses roughly {:.0}% of the time",
            (1.0 - strategy.win_rate) * 100.0
        ),
    ];
    match class {
        AssetClass::Crypto => risks.push("Crypto trades around the clock and can gap sharply".to_string()),
        AssetClass::Forex => risks.push("Currency moves are driven by central bank surprises".to_string()),
        _ => {}
    }

    TradeReasoning {
        signals: strategy.signals.clone(),
        confidence: strategy.confidence(),
        strategy_source: strategy.source.clone(),
        expected_outcome: format!(
            "Expected {:+.2}% per trade across a {}% historical win rate",
            strategy.expected_value() * 100.0,
            strategy.confidence()
        ),
        risks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::PilotPreferences;
    use crate::strategy::catalog::StrategyCatalog;
    use crate::strategy::types::RiskDna;

    fn quote(symbol: &str, price: f64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            asset_class: AssetClass::Crypto,
            as_of: Utc::now(),
        }
    }

    #[test]
    fn test_pending_trade_fields() {
        let executor = TradeExecutor::new(TradingConfig::default());
        let catalog = StrategyCatalog::builtin();
        let strategy = catalog.get("crypto_momentum").unwrap();
        let pilot = Pilot::new(
            "u",
            10_000.0,
            &PilotPreferences::default().with_risk(RiskDna::Aggressive),
        );

        let sizing = executor.explain_size(&pilot);
        assert!((sizing.scaled_size - 850.0).abs() < 1e-9);
        assert!((sizing.cap - 2_000.0).abs() < 1e-9);
        let value = sizing.final_size.unwrap();
        assert!((value - 850.0).abs() < 1e-9);

        let trade = executor.build_pending(7, &pilot, strategy, TradeSide::Buy, &quote("ETH", 3400.0), value, Utc::now());
        assert_eq!(trade.id, 7);
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.asset, "ETH");
        assert!((trade.quantity - 0.25).abs() < 1e-12);
        assert!((trade.fees - 0.85).abs() < 1e-9);
        assert!((trade.net_value - 849.15).abs() < 1e-9);
        assert_eq!(trade.reasoning.confidence, 52);
        assert_eq!(trade.reasoning.signals, strategy.signals);
        assert!(trade.narrative.expert.contains("crypto_momentum"));
        assert!(trade.educational_tip.is_some());
        assert_eq!(trade.reasoning.risks.len(), 3);
    }

    #[test]
    fn test_tiny_portfolio_not_sized() {
        let executor = TradeExecutor::new(TradingConfig::default());
        let pilot = Pilot::new(
            "u",
            20.0,
            &PilotPreferences::default().with_risk(RiskDna::UltraSafe),
        );
        let sizing = executor.explain_size(&pilot);
        assert!(sizing.final_size.is_none());
        assert!(sizing.to_string().contains("Skipped"));
    }
}
