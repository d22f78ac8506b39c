//! Explanation Generator
//!
//! Turns a trade into five narrations, from a playground metaphor up to a
//! desk-style one-liner. Output depends only on (strategy, asset, trade); no
//! clock, no randomness.

use crate::pilot::{Trade, TradeNarrative, TradeSide};
use crate::strategy::types::{Strategy, StrategyType};

/// Stateless narration builder
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationGenerator;

impl ExplanationGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn explain(&self, strategy: &Strategy, asset: &str, trade: &Trade) -> TradeNarrative {
        TradeNarrative {
            eli5: eli5(strategy, asset, trade),
            beginner: beginner(strategy, asset, trade),
            intermediate: intermediate(strategy, asset, trade),
            advanced: advanced(strategy, asset, trade),
            expert: expert(strategy, asset, trade),
        }
    }

    /// Short lesson attached to the trade, keyed by strategy type
    pub fn educational_tip(&self, strategy_type: StrategyType) -> &'static str {
        educational_tip(strategy_type)
    }
}

fn side_verb(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Buy => "bought",
        TradeSide::Sell => "sold",
    }
}

fn eli5(strategy: &Strategy, asset: &str, trade: &Trade) -> String {
    let picture = match trade.side {
        TradeSide::Buy => "like picking up apples at the market when they look ripe and fairly priced",
        TradeSide::Sell => "like selling lemonade on the hottest day, when everyone wants some",
    };
    format!(
        "Your pilot {} a little {}, {}. A helper called \"{}\" said now was a good moment.",
        side_verb(trade.side),
        asset,
        picture,
        strategy.name
    )
}

fn beginner(strategy: &Strategy, asset: &str, trade: &Trade) -> String {
    format!(
        "Your pilot {} {:.4} {} for ${:.2} using the {} strategy, which has worked about {}% of the time in the past.",
        side_verb(trade.side),
        trade.quantity,
        asset,
        trade.value,
        strategy.name,
        strategy.confidence()
    )
}

fn fill_template(strategy: &Strategy, asset: &str, side: TradeSide) -> String {
    strategy
        .narrative_template
        .replace("{asset}", asset)
        .replace("{side}", &side.to_string())
        .replace("{signal}", &strategy.primary_signal().replace('_', " "))
        .replace("{strategy}", &strategy.name)
}

fn intermediate(strategy: &Strategy, asset: &str, trade: &Trade) -> String {
    format!(
        "{} Position: ${:.2} at {:.4}, sized to your risk profile.",
        fill_template(strategy, asset, trade.side),
        trade.value,
        trade.price
    )
}

fn advanced(strategy: &Strategy, asset: &str, trade: &Trade) -> String {
    format!(
        "{} {} @ {:.4}; notional ${:.2}, fees ${:.2}. {} strategy ({}): avg return {:.2}%/trade, win rate {:.0}%, max drawdown {:.1}%, Sharpe {:.2}.",
        trade.side.to_string().to_uppercase(),
        asset,
        trade.price,
        trade.value,
        trade.fees,
        strategy.strategy_type,
        strategy.source,
        strategy.avg_return * 100.0,
        strategy.win_rate * 100.0,
        strategy.max_drawdown * 100.0,
        strategy.sharpe_ratio
    )
}

fn expert(strategy: &Strategy, asset: &str, trade: &Trade) -> String {
    format!(
        "[{}] {} {:.6} {} @ {:.6} | signals: {} | conf {}% | EV {:.4} | maxDD {:.2}% | Sharpe {:.2} | net ${:.2}",
        strategy.id,
        trade.side,
        trade.quantity,
        asset,
        trade.price,
        strategy.signals.join(","),
        trade.reasoning.confidence,
        strategy.expected_value(),
        strategy.max_drawdown * 100.0,
        strategy.sharpe_ratio,
        trade.net_value
    )
}

pub fn educational_tip(strategy_type: StrategyType) -> &'static str {
    match strategy_type {
        StrategyType::Momentum => {
            "Momentum: assets that have been rising tend to keep rising for a while. The hard part is knowing when the run is over."
        }
        StrategyType::MeanReversion => {
            "Mean reversion: prices that stretch far from their average often snap back. It works best in calm, range-bound markets."
        }
        StrategyType::TrendFollowing => {
            "Trend following: ride long moves and cut losers early. Expect many small losses paid for by a few big wins."
        }
        StrategyType::Breakout => {
            "Breakouts: when price escapes a range on heavy volume, a new move often starts. Many breakouts fail, so position size matters."
        }
        StrategyType::Arbitrage => {
            "Arbitrage: profit from the same thing priced differently in two places. Edges are small and close fast."
        }
        StrategyType::Yield => {
            "Yield: get paid to hold, through interest or rewards. Higher yield almost always means higher risk."
        }
        StrategyType::Dividend => {
            "Dividends: companies share profits with owners. A long record of raising payouts signals a durable business."
        }
        StrategyType::Value => {
            "Value: buy good assets when they are cheap relative to what they earn. Patience is the main cost."
        }
        StrategyType::Pairs => {
            "Pairs trading: bet on the gap between two related assets closing, not on the market's direction."
        }
        StrategyType::Volatility => {
            "Volatility: the size of price swings is itself tradable. Calm markets rarely stay calm forever."
        }
    }
}
