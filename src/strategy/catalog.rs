//! Strategy Catalog
//!
//! Read-only registry of absorbed strategies. Insertion order is preserved and
//! used as the ranking tie-breaker, so the catalog is a `Vec`, not a map.

use std::collections::HashSet;

use tracing::info;

use super::types::{AssetClass, RiskDna, Strategy, StrategyType};
use crate::error::{Error, Result};

#[allow(clippy::too_many_arguments)]
fn entry(
    id: &str,
    name: &str,
    source: &str,
    strategy_type: StrategyType,
    win_rate: f64,
    avg_return: f64,
    risk_level: RiskDna,
    asset_class: &[AssetClass],
    min_capital: f64,
    max_drawdown: f64,
    sharpe_ratio: f64,
    signals: &[&str],
    narrative_template: &str,
) -> Strategy {
    Strategy {
        id: id.to_string(),
        name: name.to_string(),
        source: source.to_string(),
        strategy_type,
        win_rate,
        avg_return,
        risk_level,
        asset_class: asset_class.to_vec(),
        min_capital,
        max_drawdown,
        sharpe_ratio,
        signals: signals.iter().map(|s| s.to_string()).collect(),
        narrative_template: narrative_template.to_string(),
    }
}

lazy_static::lazy_static! {
    static ref BUILTIN_STRATEGIES: Vec<Strategy> = vec![
        entry(
            "treasury_ladder", "Treasury Ladder", "Institutional fixed-income desks",
            StrategyType::Yield, 0.92, 0.004, RiskDna::UltraSafe,
            &[AssetClass::Bonds, AssetClass::Etfs], 100.0, 0.02, 1.8,
            &["yield_curve_slope", "duration_match"],
            "Rolled into {asset} to keep the bond ladder earning while {signal} stays favorable.",
        ),
        entry(
            "dividend_aristocrats", "Dividend Aristocrats", "Dividend growth investing research",
            StrategyType::Dividend, 0.68, 0.012, RiskDna::Careful,
            &[AssetClass::Stocks, AssetClass::Etfs], 250.0, 0.08, 1.3,
            &["dividend_growth", "payout_ratio"],
            "Added {asset} because {signal} points to a dependable, growing payout.",
        ),
        entry(
            "covered_call_income", "Covered Call Income", "Options income funds",
            StrategyType::Yield, 0.74, 0.009, RiskDna::Careful,
            &[AssetClass::Stocks], 500.0, 0.07, 1.4,
            &["implied_volatility_rank", "premium_decay"],
            "Positioned in {asset} to collect option premium while {signal} is elevated.",
        ),
        entry(
            "sixty_forty_rebalance", "60/40 Rebalance", "Classic balanced portfolio",
            StrategyType::Value, 0.61, 0.015, RiskDna::Balanced,
            &[AssetClass::Etfs, AssetClass::Bonds], 100.0, 0.12, 1.1,
            &["allocation_drift", "relative_valuation"],
            "Rebalanced toward {asset} after {signal} pushed the mix off target.",
        ),
        entry(
            "sector_rotation", "Sector Rotation", "Business-cycle rotation models",
            StrategyType::Momentum, 0.58, 0.021, RiskDna::Balanced,
            &[AssetClass::Stocks, AssetClass::Etfs], 500.0, 0.14, 1.05,
            &["relative_strength", "earnings_revisions"],
            "Rotated into {asset} as {signal} showed leadership shifting its way.",
        ),
        entry(
            "mean_reversion_rsi", "RSI Mean Reversion", "Short-horizon reversal studies",
            StrategyType::MeanReversion, 0.63, 0.018, RiskDna::Balanced,
            &[AssetClass::Stocks], 250.0, 0.11, 1.2,
            &["rsi_oversold", "bollinger_band_touch"],
            "Went {side} {asset} since {signal} suggests the move was overdone.",
        ),
        entry(
            "forex_carry", "FX Carry", "Currency carry trade research",
            StrategyType::Yield, 0.57, 0.014, RiskDna::Balanced,
            &[AssetClass::Forex], 1000.0, 0.15, 0.9,
            &["interest_rate_differential", "volatility_regime"],
            "Held {asset} to earn the rate gap while {signal} stays calm.",
        ),
        entry(
            "trend_following_ma", "Moving Average Trend", "Managed futures trend followers",
            StrategyType::TrendFollowing, 0.45, 0.038, RiskDna::Growth,
            &[AssetClass::Stocks, AssetClass::Commodities, AssetClass::Forex], 500.0, 0.18, 1.0,
            &["ma_crossover_50_200", "adx_trend_strength"],
            "Followed the trend in {asset} after {signal} confirmed direction.",
        ),
        entry(
            "breakout_volume", "Volume Breakout", "Technical breakout traders",
            StrategyType::Breakout, 0.48, 0.041, RiskDna::Growth,
            &[AssetClass::Stocks], 250.0, 0.20, 0.95,
            &["volume_surge", "range_breakout"],
            "Jumped on {asset} as {signal} broke it out of its range.",
        ),
        entry(
            "pairs_stat_arb", "Pairs Statistical Arbitrage", "Quant equity market-neutral desks",
            StrategyType::Pairs, 0.62, 0.016, RiskDna::Growth,
            &[AssetClass::Stocks], 2000.0, 0.09, 1.6,
            &["spread_zscore", "cointegration"],
            "Traded {asset} against its twin because {signal} stretched too far.",
        ),
        entry(
            "defi_yield_farming", "DeFi Yield Farming", "On-chain liquidity providers",
            StrategyType::Yield, 0.70, 0.030, RiskDna::Growth,
            &[AssetClass::Crypto], 100.0, 0.25, 0.9,
            &["pool_apr", "tvl_stability"],
            "Parked capital in {asset} where {signal} offers outsized yield.",
        ),
        entry(
            "crypto_momentum", "Crypto Momentum", "Time-series momentum in digital assets",
            StrategyType::Momentum, 0.52, 0.065, RiskDna::Aggressive,
            &[AssetClass::Crypto], 100.0, 0.35, 1.1,
            &["price_momentum_30d", "funding_rate"],
            "Rode the move in {asset} as {signal} kept accelerating.",
        ),
        entry(
            "earnings_drift", "Post-Earnings Drift", "Post-earnings announcement drift studies",
            StrategyType::Momentum, 0.55, 0.045, RiskDna::Aggressive,
            &[AssetClass::Stocks], 500.0, 0.22, 1.15,
            &["earnings_surprise", "analyst_upgrades"],
            "Bought into {asset} after {signal} hinted the surprise is not priced in yet.",
        ),
        entry(
            "volatility_harvest", "Volatility Harvesting", "Volatility risk premium funds",
            StrategyType::Volatility, 0.60, 0.050, RiskDna::Aggressive,
            &[AssetClass::Etfs], 1000.0, 0.30, 0.85,
            &["vix_term_structure", "realized_vs_implied"],
            "Sized into {asset} to harvest the volatility premium flagged by {signal}.",
        ),
        entry(
            "crypto_breakout", "Crypto Breakout", "Discretionary crypto swing traders",
            StrategyType::Breakout, 0.41, 0.12, RiskDna::Yolo,
            &[AssetClass::Crypto], 50.0, 0.60, 0.8,
            &["all_time_high_test", "open_interest_spike"],
            "Took a swing at {asset} because {signal} lit up.",
        ),
        entry(
            "meme_momentum", "Meme Momentum", "Retail sentiment flow trackers",
            StrategyType::Momentum, 0.38, 0.18, RiskDna::Yolo,
            &[AssetClass::Crypto, AssetClass::Stocks], 50.0, 0.75, 0.6,
            &["social_volume", "retail_order_flow"],
            "Chased {asset} while {signal} is on fire. High risk, high reward.",
        ),
    ];
}

/// Registry of immutable strategy records
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    strategies: Vec<Strategy>,
}

impl StrategyCatalog {
    /// Build a catalog, validating every record
    pub fn new(strategies: Vec<Strategy>) -> Result<Self> {
        let mut seen = HashSet::new();
        for strategy in &strategies {
            validate_strategy(strategy)?;
            if !seen.insert(strategy.id.clone()) {
                return Err(Error::DuplicateStrategy(strategy.id.clone()));
            }
        }
        Ok(Self { strategies })
    }

    /// The absorbed strategies shipped with the engine
    pub fn builtin() -> Self {
        Self {
            strategies: BUILTIN_STRATEGIES.clone(),
        }
    }

    /// Load a catalog from a JSON array of strategy records
    pub fn from_json(json: &str) -> Result<Self> {
        let strategies: Vec<Strategy> = serde_json::from_str(json)?;
        let catalog = Self::new(strategies)?;
        info!("Loaded {} strategies from JSON catalog", catalog.len());
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.id == id)
    }

    /// All strategies in insertion order
    pub fn all(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate_strategy(strategy: &Strategy) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidStrategy {
        id: strategy.id.clone(),
        reason: reason.to_string(),
    };

    if strategy.id.trim().is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if !(0.0..=1.0).contains(&strategy.win_rate) {
        return Err(invalid("win_rate must be within [0, 1]"));
    }
    if strategy.max_drawdown < 0.0 || !strategy.max_drawdown.is_finite() {
        return Err(invalid("max_drawdown must be a non-negative number"));
    }
    if strategy.min_capital < 0.0 {
        return Err(invalid("min_capital must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.len(), 16);
        assert!(StrategyCatalog::new(catalog.all().to_vec()).is_ok());
    }

    #[test]
    fn test_every_tier_is_covered() {
        let catalog = StrategyCatalog::builtin();
        for tier in RiskDna::ALL {
            assert!(
                catalog.all().iter().any(|s| s.risk_level == tier),
                "no strategy for tier {}",
                tier
            );
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut strategies = StrategyCatalog::builtin().all().to_vec();
        strategies.push(strategies[0].clone());
        assert!(matches!(
            StrategyCatalog::new(strategies),
            Err(Error::DuplicateStrategy(_))
        ));
    }

    #[test]
    fn test_out_of_range_win_rate_rejected() {
        let mut strategy = StrategyCatalog::builtin().all()[0].clone();
        strategy.win_rate = 1.5;
        assert!(matches!(
            StrategyCatalog::new(vec![strategy]),
            Err(Error::InvalidStrategy { .. })
        ));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::to_string(&StrategyCatalog::builtin().all()[..2]).unwrap();
        let catalog = StrategyCatalog::from_json(&json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.all()[0].id, "treasury_ladder");
        assert!(catalog.get("dividend_aristocrats").is_some());
        assert!(catalog.get("missing").is_none());

        assert!(matches!(
            StrategyCatalog::from_json("[{\"id\": 1}]"),
            Err(Error::Serialization(_))
        ));
    }
}
