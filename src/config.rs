//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::engine::{SchedulerConfig, TradingConfig};
pub use crate::events::EventsConfig;
pub use crate::learning::LearningConfig;
pub use crate::pilot::WatchConfig;
use crate::pilot::watch::RECENT_TRADES_CAPACITY;
pub use crate::social::SocialProofConfig;
pub use crate::store::StorageConfig;
pub use crate::strategy::randomization::RandomizationConfig;
pub use crate::strategy::sizing::PositionSizingConfig;

/// Main configuration structure. Every section is optional; a missing file
/// yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub social_proof: SocialProofConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub randomization: RandomizationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables, e.g. AUTOPILOT_TRADING__TOP_N
            .add_source(
                config::Environment::with_prefix("AUTOPILOT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Intervals
        if self.scheduler.trading_interval_secs == 0 {
            anyhow::bail!("scheduler.trading_interval_secs must be positive");
        }
        if self.scheduler.learning_interval_secs == 0 {
            anyhow::bail!("scheduler.learning_interval_secs must be positive");
        }
        if self.scheduler.social_proof_interval_secs == 0 {
            anyhow::bail!("scheduler.social_proof_interval_secs must be positive");
        }

        // Trading
        if self.trading.top_n == 0 {
            anyhow::bail!("trading.top_n must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.trading.admission_factor) {
            anyhow::bail!("trading.admission_factor must be between 0 and 1");
        }
        if !(0.0..=1.0).contains(&self.trading.buy_bias) {
            anyhow::bail!("trading.buy_bias must be between 0 and 1");
        }
        if !(0.0..1.0).contains(&self.trading.fee_rate) {
            anyhow::bail!("trading.fee_rate must be in [0, 1)");
        }

        // Sizing
        let sizing = &self.trading.sizing;
        if sizing.base_allocation_pct <= 0.0 || sizing.base_allocation_pct > 1.0 {
            anyhow::bail!("trading.sizing.base_allocation_pct must be in (0, 1]");
        }
        if sizing.max_allocation_pct <= 0.0 || sizing.max_allocation_pct > 1.0 {
            anyhow::bail!("trading.sizing.max_allocation_pct must be in (0, 1]");
        }
        if sizing.min_notional < 0.0 {
            anyhow::bail!("trading.sizing.min_notional cannot be negative");
        }

        // Buffers
        let recent = self.watch.recent_capacity;
        if recent == 0 || recent > RECENT_TRADES_CAPACITY {
            anyhow::bail!(
                "watch.recent_capacity must be between 1 and {}",
                RECENT_TRADES_CAPACITY
            );
        }
        if self.learning.history_capacity == 0 {
            anyhow::bail!("learning.history_capacity must be at least 1");
        }

        if self.social_proof.cohort_band < 0.0 {
            anyhow::bail!("social_proof.cohort_band cannot be negative");
        }

        let r = &self.randomization;
        if r.jitter_min > r.jitter_max {
            anyhow::bail!(
                "randomization.jitter_min ({}) exceeds jitter_max ({})",
                r.jitter_min,
                r.jitter_max
            );
        }
        if r.daily_volatility < 0.0 {
            anyhow::bail!("randomization.daily_volatility cannot be negative");
        }

        if self.scheduler.execution_delay_ms > self.scheduler.trading_interval_secs * 1000 {
            tracing::warn!(
                "execution_delay_ms exceeds the trading interval - cycles will overlap their own delay"
            );
        }

        Ok(())
    }

    /// Human-readable summary for the `config` command
    pub fn summary(&self) -> String {
        format!(
            r#"Configuration:
  Scheduler:
    trading_interval: {}s
    learning_interval: {}s
    social_proof_interval: {}s
    execution_delay: {}ms
  Trading:
    top_n: {}
    admission_factor: {}
    buy_bias: {}
    max_trades_per_cycle: {}
    fee_rate: {}
    base_allocation: {}%
    max_allocation: {}%
  Watch:
    recent_trades: {}
  Learning:
    min_trades: {}
    history: {} points
  Social proof:
    cohort_band: +/-{}%
  Randomization:
    seed: {}
    jitter: {} - {}
  Storage:
    path: {}
"#,
            self.scheduler.trading_interval_secs,
            self.scheduler.learning_interval_secs,
            self.scheduler.social_proof_interval_secs,
            self.scheduler.execution_delay_ms,
            self.trading.top_n,
            self.trading.admission_factor,
            self.trading.buy_bias,
            self.trading.max_trades_per_cycle,
            self.trading.fee_rate,
            self.trading.sizing.base_allocation_pct * 100.0,
            self.trading.sizing.max_allocation_pct * 100.0,
            self.watch.recent_capacity,
            self.learning.min_trades,
            self.learning.history_capacity,
            self.social_proof.cohort_band * 100.0,
            self.randomization
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(entropy)".to_string()),
            self.randomization.jitter_min,
            self.randomization.jitter_max,
            self.storage.path.as_deref().unwrap_or("(in-memory)"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.trading_interval_secs, 60);
        assert_eq!(config.scheduler.learning_interval_secs, 300);
        assert_eq!(config.scheduler.execution_delay_ms, 2000);
        assert_eq!(config.trading.top_n, 10);
        assert_eq!(config.watch.recent_capacity, 20);
        assert_eq!(config.learning.min_trades, 5);
        assert!(config.storage.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.trading.max_trades_per_cycle, 1);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[scheduler]
trading_interval_secs = 5

[trading]
buy_bias = 0.5

[randomization]
seed = 42
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scheduler.trading_interval_secs, 5);
        assert_eq!(config.scheduler.learning_interval_secs, 300);
        assert_eq!(config.trading.buy_bias, 0.5);
        assert_eq!(config.trading.top_n, 10);
        assert_eq!(config.randomization.seed, Some(42));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[trading]\nbuy_bias = 1.5").unwrap();
        assert!(Config::load(file.path()).is_err());

        let mut config = Config::default();
        config.randomization.jitter_min = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recent_capacity_bounded() {
        let mut config = Config::default();
        config.watch.recent_capacity = RECENT_TRADES_CAPACITY;
        assert!(config.validate().is_ok());
        config.watch.recent_capacity = 50;
        assert!(config.validate().is_err());
        config.watch.recent_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("AUTOPILOT_LEARNING__HISTORY_CAPACITY", "30");
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml"));
        std::env::remove_var("AUTOPILOT_LEARNING__HISTORY_CAPACITY");
        assert_eq!(config.unwrap().learning.history_capacity, 30);
    }

    #[test]
    fn test_summary_mentions_storage() {
        let mut config = Config::default();
        assert!(config.summary().contains("(in-memory)"));
        config.storage.path = Some("state.json".to_string());
        assert!(config.summary().contains("state.json"));
    }
}
