//! Price oracle
//!
//! Quotes for the assets strategies trade. The engine only depends on the
//! `PriceOracle` trait; `StaticPriceOracle` is a fixed stand-in table used for
//! demos and tests until a live market-data source is wired in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::strategy::types::{AssetClass, Strategy};

/// Point-in-time price for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub asset_class: AssetClass,
    pub as_of: DateTime<Utc>,
}

/// Source of asset selection and prices
#[async_trait]
pub trait PriceOracle: Send + Sync {
    fn name(&self) -> &'static str;

    /// Symbol the strategy should trade within `class`, if any is known
    async fn pick_asset(&self, class: AssetClass, strategy: &Strategy) -> Option<String>;

    /// Latest quote. `None` when the symbol is unknown.
    async fn quote(&self, symbol: &str) -> Option<Quote>;
}

const DEFAULT_TABLE: &[(&str, AssetClass, f64)] = &[
    ("AAPL", AssetClass::Stocks, 189.5),
    ("MSFT", AssetClass::Stocks, 415.2),
    ("NVDA", AssetClass::Stocks, 875.3),
    ("GOOGL", AssetClass::Stocks, 152.8),
    ("AMZN", AssetClass::Stocks, 178.4),
    ("BTC", AssetClass::Crypto, 67_250.0),
    ("ETH", AssetClass::Crypto, 3_480.0),
    ("SOL", AssetClass::Crypto, 145.6),
    ("EUR/USD", AssetClass::Forex, 1.0842),
    ("GBP/USD", AssetClass::Forex, 1.2675),
    ("USD/JPY", AssetClass::Forex, 151.3),
    ("SPY", AssetClass::Etfs, 512.4),
    ("QQQ", AssetClass::Etfs, 438.9),
    ("VTI", AssetClass::Etfs, 254.1),
    ("SCHD", AssetClass::Etfs, 78.6),
    ("TLT", AssetClass::Bonds, 93.2),
    ("BND", AssetClass::Bonds, 72.4),
    ("SHY", AssetClass::Bonds, 81.7),
    ("GLD", AssetClass::Commodities, 215.8),
    ("USO", AssetClass::Commodities, 76.9),
];

/// In-memory quote table
pub struct StaticPriceOracle {
    /// symbol -> (class, price)
    prices: DashMap<String, (AssetClass, f64)>,
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        let prices = DashMap::new();
        for (symbol, class, price) in DEFAULT_TABLE {
            prices.insert(symbol.to_string(), (*class, *price));
        }
        Self { prices }
    }

    /// Empty table, for tests that want full control over quotes
    pub fn empty() -> Self {
        Self {
            prices: DashMap::new(),
        }
    }

    /// Insert or move a price
    pub fn set_price(&self, symbol: &str, class: AssetClass, price: f64) {
        self.prices.insert(symbol.to_string(), (class, price));
    }

    pub fn remove(&self, symbol: &str) {
        self.prices.remove(symbol);
    }

    /// Symbols of a class, sorted so picks are stable across runs
    fn symbols_for(&self, class: AssetClass) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .prices
            .iter()
            .filter(|entry| entry.value().0 == class)
            .map(|entry| entry.key().clone())
            .collect();
        symbols.sort();
        symbols
    }
}

impl Default for StaticPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn pick_asset(&self, class: AssetClass, strategy: &Strategy) -> Option<String> {
        let symbols = self.symbols_for(class);
        if symbols.is_empty() {
            return None;
        }
        let hash: usize = strategy.id.bytes().map(|b| b as usize).sum();
        Some(symbols[hash % symbols.len()].clone())
    }

    async fn quote(&self, symbol: &str) -> Option<Quote> {
        let entry = self.prices.get(symbol)?;
        let (asset_class, price) = *entry.value();
        Some(Quote {
            symbol: symbol.to_string(),
            price,
            asset_class,
            as_of: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::catalog::StrategyCatalog;

    #[tokio::test]
    async fn test_pick_asset_is_stable_and_in_class() {
        let oracle = StaticPriceOracle::new();
        let catalog = StrategyCatalog::builtin();
        for strategy in catalog.all() {
            let class = strategy.primary_asset_class();
            let first = oracle.pick_asset(class, strategy).await.unwrap();
            let second = oracle.pick_asset(class, strategy).await.unwrap();
            assert_eq!(first, second);
            assert_eq!(oracle.quote(&first).await.unwrap().asset_class, class);
        }
    }

    #[tokio::test]
    async fn test_unknown_symbol_has_no_quote() {
        let oracle = StaticPriceOracle::new();
        assert!(oracle.quote("DOGE").await.is_none());
    }

    #[tokio::test]
    async fn test_set_price_overrides() {
        let oracle = StaticPriceOracle::empty();
        let catalog = StrategyCatalog::builtin();
        let strategy = catalog.get("crypto_momentum").unwrap();
        assert!(oracle.pick_asset(AssetClass::Crypto, strategy).await.is_none());

        oracle.set_price("BTC", AssetClass::Crypto, 50_000.0);
        assert_eq!(
            oracle.pick_asset(AssetClass::Crypto, strategy).await.as_deref(),
            Some("BTC")
        );
        assert_eq!(oracle.quote("BTC").await.unwrap().price, 50_000.0);
    }
}
