//! Position Sizing
//!
//! Size scales with portfolio value and the pilot's risk score, capped at a
//! fixed share of the portfolio. Sizes below the minimum tradable notional are
//! skipped rather than rounded up.

use serde::{Deserialize, Serialize};

/// Position sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizingConfig {
    /// Share of portfolio value at risk score 100
    #[serde(default = "default_base_allocation_pct")]
    pub base_allocation_pct: f64,
    /// Hard cap as share of portfolio value
    #[serde(default = "default_max_allocation_pct")]
    pub max_allocation_pct: f64,
    /// Smallest notional worth trading, in account currency
    #[serde(default = "default_min_notional")]
    pub min_notional: f64,
}

fn default_base_allocation_pct() -> f64 {
    0.1
}

fn default_max_allocation_pct() -> f64 {
    0.2
}

fn default_min_notional() -> f64 {
    1.0
}

impl Default for PositionSizingConfig {
    fn default() -> Self {
        Self {
            base_allocation_pct: default_base_allocation_pct(),
            max_allocation_pct: default_max_allocation_pct(),
            min_notional: default_min_notional(),
        }
    }
}

/// Context for position sizing
#[derive(Debug, Clone, Copy)]
pub struct SizingContext {
    pub current_value: f64,
    pub risk_score: u8,
}

/// Position Sizer
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: PositionSizingConfig,
}

impl PositionSizer {
    pub fn new(config: PositionSizingConfig) -> Self {
        Self { config }
    }

    /// Notional for a new position: `min(base * value * risk/100, max * value)`
    fn raw_size(&self, ctx: &SizingContext) -> f64 {
        let value = ctx.current_value.max(0.0);
        let risk_factor = ctx.risk_score as f64 / 100.0;
        let scaled = self.config.base_allocation_pct * value * risk_factor;
        scaled.min(self.config.max_allocation_pct * value)
    }

    /// Calculate position size. `None` when below the minimum notional.
    pub fn calculate_size(&self, ctx: &SizingContext) -> Option<f64> {
        let size = self.raw_size(ctx);
        if size < self.config.min_notional || !size.is_finite() {
            return None;
        }
        Some(size)
    }

    /// Get size breakdown for explanation
    pub fn explain_size(&self, ctx: &SizingContext) -> SizeExplanation {
        let value = ctx.current_value.max(0.0);
        SizeExplanation {
            portfolio_value: value,
            risk_factor: ctx.risk_score as f64 / 100.0,
            scaled_size: self.config.base_allocation_pct * value * (ctx.risk_score as f64 / 100.0),
            cap: self.config.max_allocation_pct * value,
            min_notional: self.config.min_notional,
            final_size: self.calculate_size(ctx),
        }
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(PositionSizingConfig::default())
    }
}

/// Explanation of how size was calculated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeExplanation {
    pub portfolio_value: f64,
    pub risk_factor: f64,
    pub scaled_size: f64,
    pub cap: f64,
    pub min_notional: f64,
    pub final_size: Option<f64>,
}

impl std::fmt::Display for SizeExplanation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Position Size Calculation:")?;
        writeln!(f, "  Portfolio value: {:.2}", self.portfolio_value)?;
        writeln!(f, "  × Risk factor ({:.2}) = {:.2}", self.risk_factor, self.scaled_size)?;
        writeln!(f, "  Cap: {:.2}", self.cap)?;
        match self.final_size {
            Some(size) => writeln!(f, "  = Final: {:.2}", size),
            None => writeln!(f, "  = Skipped (below minimum {:.2})", self.min_notional),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_scaled_size() {
        let sizer = PositionSizer::default();
        let size = sizer
            .calculate_size(&SizingContext {
                current_value: 10_000.0,
                risk_score: 85,
            })
            .unwrap();
        assert!((size - 850.0).abs() < 1e-9);
    }

    #[test]
    fn test_cap_applies() {
        let sizer = PositionSizer::new(PositionSizingConfig {
            base_allocation_pct: 0.5,
            max_allocation_pct: 0.2,
            min_notional: 1.0,
        });
        let size = sizer
            .calculate_size(&SizingContext {
                current_value: 1000.0,
                risk_score: 100,
            })
            .unwrap();
        assert!((size - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_below_minimum_is_skipped() {
        let sizer = PositionSizer::default();
        // 0.1 * 50 * 0.10 = 0.5 < 1.0
        assert!(sizer
            .calculate_size(&SizingContext {
                current_value: 50.0,
                risk_score: 10,
            })
            .is_none());
    }

    #[test]
    fn test_explain_size() {
        let sizer = PositionSizer::default();
        let explanation = sizer.explain_size(&SizingContext {
            current_value: 1000.0,
            risk_score: 50,
        });
        assert!((explanation.final_size.unwrap() - 50.0).abs() < 1e-9);
        assert!(explanation.to_string().contains("Final"));
    }
}
