//! Shared types for the strategy catalog
//!
//! Risk tiers, strategy classifications and the immutable `Strategy` record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower bound applied to drawdown when ranking, so zero-drawdown entries stay finite
pub const DRAWDOWN_EPSILON: f64 = 1e-6;

/// Ordinal risk tolerance ("risk DNA"), declared by the user or discovered from behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDna {
    UltraSafe,
    #[serde(alias = "conservative")]
    Careful,
    Balanced,
    Growth,
    Aggressive,
    #[serde(alias = "maximum")]
    Yolo,
}

impl Default for RiskDna {
    fn default() -> Self {
        Self::Balanced
    }
}

impl RiskDna {
    /// All tiers, safest first
    pub const ALL: [RiskDna; 6] = [
        RiskDna::UltraSafe,
        RiskDna::Careful,
        RiskDna::Balanced,
        RiskDna::Growth,
        RiskDna::Aggressive,
        RiskDna::Yolo,
    ];

    /// Numeric score on the 0-100 scale
    pub fn score(self) -> u8 {
        match self {
            RiskDna::UltraSafe => 10,
            RiskDna::Careful => 25,
            RiskDna::Balanced => 50,
            RiskDna::Growth => 70,
            RiskDna::Aggressive => 85,
            RiskDna::Yolo => 100,
        }
    }

    /// Nearest tier for an arbitrary score. Ties go to the safer tier.
    pub fn from_score(score: f64) -> RiskDna {
        let mut best = RiskDna::UltraSafe;
        let mut best_distance = f64::MAX;
        for tier in Self::ALL {
            let distance = (tier.score() as f64 - score).abs();
            if distance < best_distance {
                best = tier;
                best_distance = distance;
            }
        }
        best
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskDna::UltraSafe => "ultra_safe",
            RiskDna::Careful => "careful",
            RiskDna::Balanced => "balanced",
            RiskDna::Growth => "growth",
            RiskDna::Aggressive => "aggressive",
            RiskDna::Yolo => "yolo",
        }
    }
}

impl fmt::Display for RiskDna {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskDna {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ultra_safe" => Ok(RiskDna::UltraSafe),
            "careful" | "conservative" => Ok(RiskDna::Careful),
            "balanced" => Ok(RiskDna::Balanced),
            "growth" => Ok(RiskDna::Growth),
            "aggressive" => Ok(RiskDna::Aggressive),
            "yolo" | "maximum" => Ok(RiskDna::Yolo),
            other => Err(format!("unknown risk tier: {}", other)),
        }
    }
}

/// Strategy classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    Momentum,
    MeanReversion,
    TrendFollowing,
    Breakout,
    Arbitrage,
    Yield,
    Dividend,
    Value,
    Pairs,
    Volatility,
}

impl StrategyType {
    /// Income-producing strategies, the only ones a yield-focused pilot accepts
    pub fn is_income(self) -> bool {
        matches!(self, StrategyType::Yield | StrategyType::Dividend)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyType::Momentum => "momentum",
            StrategyType::MeanReversion => "mean_reversion",
            StrategyType::TrendFollowing => "trend_following",
            StrategyType::Breakout => "breakout",
            StrategyType::Arbitrage => "arbitrage",
            StrategyType::Yield => "yield",
            StrategyType::Dividend => "dividend",
            StrategyType::Value => "value",
            StrategyType::Pairs => "pairs",
            StrategyType::Volatility => "volatility",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tradable asset classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Stocks,
    Crypto,
    Forex,
    Etfs,
    Bonds,
    Commodities,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Stocks => write!(f, "stocks"),
            AssetClass::Crypto => write!(f, "crypto"),
            AssetClass::Forex => write!(f, "forex"),
            AssetClass::Etfs => write!(f, "etfs"),
            AssetClass::Bonds => write!(f, "bonds"),
            AssetClass::Commodities => write!(f, "commodities"),
        }
    }
}

/// Immutable catalog entry describing a trading approach and its track record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    /// Where the approach was absorbed from
    pub source: String,
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,
    /// Historical win rate, 0.0 to 1.0
    pub win_rate: f64,
    /// Average return per trade as a fraction (0.02 = 2%)
    pub avg_return: f64,
    pub risk_level: RiskDna,
    pub asset_class: Vec<AssetClass>,
    pub min_capital: f64,
    /// Worst historical peak-to-trough loss as a fraction
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub signals: Vec<String>,
    /// Narration template; supports {asset}, {side}, {signal} and {strategy}
    pub narrative_template: String,
}

impl Strategy {
    /// Asset class trades are sourced from. Strategies without tags trade stocks.
    pub fn primary_asset_class(&self) -> AssetClass {
        self.asset_class.first().copied().unwrap_or(AssetClass::Stocks)
    }

    pub fn supports(&self, class: AssetClass) -> bool {
        self.asset_class.contains(&class)
    }

    /// Risk-adjusted quality used to rank strategies: return x hit rate per unit of drawdown
    pub fn ranking_score(&self) -> f64 {
        (self.avg_return * self.win_rate) / self.max_drawdown.max(DRAWDOWN_EPSILON)
    }

    /// Expected return per trade
    pub fn expected_value(&self) -> f64 {
        self.avg_return * self.win_rate
    }

    /// Win rate expressed as a whole percentage
    pub fn confidence(&self) -> u8 {
        (self.win_rate * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn primary_signal(&self) -> &str {
        self.signals.first().map(String::as_str).unwrap_or("price action")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_scores_are_fixed() {
        assert_eq!(RiskDna::UltraSafe.score(), 10);
        assert_eq!(RiskDna::Careful.score(), 25);
        assert_eq!(RiskDna::Balanced.score(), 50);
        assert_eq!(RiskDna::Growth.score(), 70);
        assert_eq!(RiskDna::Aggressive.score(), 85);
        assert_eq!(RiskDna::Yolo.score(), 100);
    }

    #[test]
    fn test_from_score_nearest_tier() {
        assert_eq!(RiskDna::from_score(0.0), RiskDna::UltraSafe);
        assert_eq!(RiskDna::from_score(40.0), RiskDna::Balanced);
        assert_eq!(RiskDna::from_score(77.0), RiskDna::Growth);
        assert_eq!(RiskDna::from_score(78.0), RiskDna::Aggressive);
        assert_eq!(RiskDna::from_score(150.0), RiskDna::Yolo);
        // 37.5 is equidistant from careful and balanced
        assert_eq!(RiskDna::from_score(37.5), RiskDna::Careful);
    }

    #[test]
    fn test_risk_aliases_deserialize() {
        let yolo: RiskDna = serde_json::from_str(r#""maximum""#).unwrap();
        assert_eq!(yolo, RiskDna::Yolo);
        let careful: RiskDna = serde_json::from_str(r#""conservative""#).unwrap();
        assert_eq!(careful, RiskDna::Careful);
        assert_eq!("ultra-safe".parse::<RiskDna>().unwrap(), RiskDna::UltraSafe);
        assert!("reckless".parse::<RiskDna>().is_err());
    }

    #[test]
    fn test_ranking_score_guards_zero_drawdown() {
        let strategy = Strategy {
            id: "flat".to_string(),
            name: "Flat".to_string(),
            source: "test".to_string(),
            strategy_type: StrategyType::Value,
            win_rate: 0.5,
            avg_return: 0.01,
            risk_level: RiskDna::Balanced,
            asset_class: vec![],
            min_capital: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 1.0,
            signals: vec![],
            narrative_template: String::new(),
        };
        assert!(strategy.ranking_score().is_finite());
        assert_eq!(strategy.primary_asset_class(), AssetClass::Stocks);
        assert_eq!(strategy.primary_signal(), "price action");
        assert_eq!(strategy.confidence(), 50);
    }
}
