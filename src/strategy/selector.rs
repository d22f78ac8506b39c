//! Allocation Selector
//!
//! Filters the catalog down to strategies compatible with a pilot's risk and
//! asset preferences, then ranks them by risk-adjusted quality. Pure function
//! of (pilot, catalog); safe to call at any rate.

use super::catalog::StrategyCatalog;
use super::types::{AssetClass, Strategy};
use crate::pilot::{AssetMix, Pilot};

/// Maximum distance between a strategy's tier score and the pilot's risk score
pub const RISK_BAND: f64 = 30.0;

/// Risk tiers within `RISK_BAND` points (inclusive) are compatible
pub fn is_risk_compatible(strategy: &Strategy, risk_score: u8) -> bool {
    (strategy.risk_level.score() as f64 - risk_score as f64).abs() <= RISK_BAND
}

/// Asset-class gate. Unrecognized mixes accept everything.
pub fn is_asset_compatible(strategy: &Strategy, asset_mix: AssetMix) -> bool {
    match asset_mix {
        AssetMix::Diversified => true,
        AssetMix::StocksOnly => strategy.supports(AssetClass::Stocks),
        AssetMix::CryptoOnly => strategy.supports(AssetClass::Crypto),
        AssetMix::ForexOnly => strategy.supports(AssetClass::Forex),
        AssetMix::YieldFocused => strategy.strategy_type.is_income(),
        AssetMix::Unrecognized => true,
    }
}

/// Eligible strategies for `pilot`, best first.
///
/// Ranked by `(avg_return * win_rate) / max(max_drawdown, eps)` descending; the
/// sort is stable so equal scores keep catalog order.
pub fn select_strategies_for_pilot<'a>(pilot: &Pilot, catalog: &'a StrategyCatalog) -> Vec<&'a Strategy> {
    let mut eligible: Vec<&Strategy> = catalog
        .all()
        .iter()
        .filter(|s| is_risk_compatible(s, pilot.risk_score))
        .filter(|s| is_asset_compatible(s, pilot.asset_mix))
        .filter(|s| s.min_capital <= pilot.current_value)
        .collect();

    eligible.sort_by(|a, b| b.ranking_score().total_cmp(&a.ranking_score()));
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pilot::PilotPreferences;
    use crate::strategy::types::{RiskDna, StrategyType};

    fn pilot(risk: RiskDna, mix: AssetMix, deposit: f64) -> Pilot {
        Pilot::new(
            "user",
            deposit,
            &PilotPreferences::default().with_risk(risk).with_asset_mix(mix),
        )
    }

    fn strategy(id: &str, risk: RiskDna, win_rate: f64, avg_return: f64, drawdown: f64) -> Strategy {
        Strategy {
            id: id.to_string(),
            name: id.to_string(),
            source: "test".to_string(),
            strategy_type: StrategyType::Momentum,
            win_rate,
            avg_return,
            risk_level: risk,
            asset_class: vec![AssetClass::Stocks],
            min_capital: 0.0,
            max_drawdown: drawdown,
            sharpe_ratio: 1.0,
            signals: vec![],
            narrative_template: String::new(),
        }
    }

    #[test]
    fn test_risk_band_is_inclusive() {
        let s = strategy("s", RiskDna::Growth, 0.5, 0.1, 0.1);
        assert!(is_risk_compatible(&s, 40)); // 70 - 40 = 30
        assert!(!is_risk_compatible(&s, 39));
        assert!(is_risk_compatible(&s, 100));
    }

    #[test]
    fn test_ranking_descending_and_deterministic() {
        let catalog = StrategyCatalog::builtin();
        for risk in RiskDna::ALL {
            let p = pilot(risk, AssetMix::Diversified, 100_000.0);
            let first = select_strategies_for_pilot(&p, &catalog);
            let second = select_strategies_for_pilot(&p, &catalog);
            assert!(!first.is_empty());
            for pair in first.windows(2) {
                assert!(pair[0].ranking_score() >= pair[1].ranking_score());
            }
            let ids: Vec<&str> = first.iter().map(|s| s.id.as_str()).collect();
            let again: Vec<&str> = second.iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, again);
        }
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let catalog = StrategyCatalog::new(vec![
            strategy("first", RiskDna::Balanced, 0.5, 0.02, 0.1),
            strategy("better", RiskDna::Balanced, 0.6, 0.05, 0.1),
            strategy("second", RiskDna::Balanced, 0.5, 0.02, 0.1),
        ])
        .unwrap();
        let p = pilot(RiskDna::Balanced, AssetMix::Diversified, 1000.0);
        let ids: Vec<&str> = select_strategies_for_pilot(&p, &catalog)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["better", "first", "second"]);
    }

    #[test]
    fn test_crypto_only_filters_asset_class() {
        let catalog = StrategyCatalog::builtin();
        let p = pilot(RiskDna::Aggressive, AssetMix::CryptoOnly, 100_000.0);
        let selected = select_strategies_for_pilot(&p, &catalog);
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.supports(AssetClass::Crypto)));
    }

    #[test]
    fn test_yield_focused_requires_income_type() {
        let catalog = StrategyCatalog::builtin();
        let p = pilot(RiskDna::Careful, AssetMix::YieldFocused, 100_000.0);
        let selected = select_strategies_for_pilot(&p, &catalog);
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.strategy_type.is_income()));
    }

    #[test]
    fn test_unrecognized_mix_fails_open() {
        let catalog = StrategyCatalog::builtin();
        let open = select_strategies_for_pilot(&pilot(RiskDna::Balanced, AssetMix::Unrecognized, 100_000.0), &catalog);
        let diversified =
            select_strategies_for_pilot(&pilot(RiskDna::Balanced, AssetMix::Diversified, 100_000.0), &catalog);
        assert_eq!(open.len(), diversified.len());
    }

    #[test]
    fn test_min_capital_excludes_expensive_strategies() {
        let catalog = StrategyCatalog::builtin();
        let p = pilot(RiskDna::Growth, AssetMix::Diversified, 200.0);
        let selected = select_strategies_for_pilot(&p, &catalog);
        assert!(selected.iter().all(|s| s.min_capital <= 200.0));
        assert!(selected.iter().all(|s| s.id != "pairs_stat_arb"));
    }
}
