//! Configuration management
//!
//! Loads and validates the JSON run configuration: instrument economics,
//! strategy parameters, run limits, score weights, data paths and the
//! optional optimization grid.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::BreakoutConfig;
use crate::score::ScoreWeights;
use crate::types::InstrumentSpec;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instrument: InstrumentSpec,
    pub strategy: BreakoutConfig,
    pub run: RunConfig,
    pub score_weights: ScoreWeights,
    pub data: DataConfig,
    /// Grid search parameters for optimization (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridParams>,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.strategy.range.lookback_period == 0 {
            bail!("lookback_period must be at least 1");
        }
        if self.strategy.risk_percent <= 0.0 || self.strategy.risk_percent > 100.0 {
            bail!(
                "risk_percent must be in (0, 100], got {}",
                self.strategy.risk_percent
            );
        }
        if self.strategy.stop_loss_distance <= 0.0 {
            bail!("stop_loss_distance must be positive");
        }
        if self.strategy.take_profit_distance <= 0.0 {
            bail!("take_profit_distance must be positive");
        }
        if self.run.starting_equity <= 0.0 {
            bail!("starting_equity must be positive");
        }
        if self.run.max_periods_open == 0 {
            bail!("max_periods_open must be at least 1");
        }
        if self.run.max_drawdown_fraction <= 0.0 || self.run.max_drawdown_fraction > 1.0 {
            bail!(
                "max_drawdown_fraction must be in (0, 1], got {}",
                self.run.max_drawdown_fraction
            );
        }
        if let Some(seconds) = self.run.interval_seconds {
            if seconds <= 0 {
                bail!("interval_seconds must be positive, got {}", seconds);
            }
        }
        if self.instrument.tick_size <= 0.0 {
            bail!("instrument tick_size must be positive");
        }
        if self.instrument.volume_step <= 0.0 {
            bail!("instrument volume_step must be positive");
        }
        if self.instrument.min_volume > self.instrument.max_volume {
            bail!(
                "instrument min_volume ({}) exceeds max_volume ({})",
                self.instrument.min_volume,
                self.instrument.max_volume
            );
        }
        Ok(())
    }
}

/// Run-level limits and sampling mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub starting_equity: f64,
    /// Forced exit after this many evaluation periods
    pub max_periods_open: usize,
    pub max_drawdown_fraction: f64,
    /// When set, evaluation periods open on elapsed data time instead of
    /// once per appended bar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<i64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            starting_equity: 10_000.0,
            max_periods_open: 10,
            max_drawdown_fraction: 0.30,
            interval_seconds: None,
        }
    }
}

/// Data source paths and the synthetic fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file of bars; when absent or missing a seeded synthetic walk is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<String>,
    pub results_dir: String,
    pub synthetic_periods: usize,
    pub synthetic_start_price: f64,
    pub random_seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_file: None,
            results_dir: "results".to_string(),
            synthetic_periods: 1000,
            synthetic_start_price: 1.10,
            random_seed: 42,
        }
    }
}

/// Parameter grid for the optimizer; the cross product of all axes is
/// expanded into one config per cell
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub lookbacks: Vec<usize>,
    pub range_thresholds: Vec<f64>,
    pub stop_loss_distances: Vec<f64>,
    pub take_profit_distances: Vec<f64>,
    pub risk_percents: Vec<f64>,
    pub max_periods_open: Vec<usize>,
}

impl Default for GridParams {
    fn default() -> Self {
        GridParams::quick()
    }
}

impl GridParams {
    /// Quick: 48 combinations
    pub fn quick() -> Self {
        Self {
            lookbacks: vec![6, 8, 10],
            range_thresholds: vec![0.003, 0.004],
            stop_loss_distances: vec![0.0009, 0.0015],
            take_profit_distances: vec![0.0025, 0.0040],
            risk_percents: vec![1.0],
            max_periods_open: vec![10, 14],
        }
    }

    /// Full: 1296 combinations
    pub fn full() -> Self {
        Self {
            lookbacks: vec![5, 6, 7, 8, 9, 10],
            range_thresholds: vec![0.002, 0.003, 0.004],
            stop_loss_distances: vec![0.0009, 0.0012, 0.0015],
            take_profit_distances: vec![0.0020, 0.0025, 0.0030],
            risk_percents: vec![1.0, 2.0],
            max_periods_open: vec![8, 10, 12, 14],
        }
    }

    /// Expand into one config per cell, skipping cells where the target is
    /// not beyond the stop
    pub fn generate_configs(&self, base: &Config) -> Vec<Config> {
        use itertools::iproduct;

        iproduct!(
            &self.lookbacks,
            &self.range_thresholds,
            &self.stop_loss_distances,
            &self.take_profit_distances,
            &self.risk_percents,
            &self.max_periods_open
        )
        .filter_map(|(lookback, threshold, stop, target, risk, hold)| {
            if target <= stop {
                return None;
            }

            let mut config = base.clone();
            config.strategy.range.lookback_period = *lookback;
            config.strategy.range.range_threshold_value = *threshold;
            config.strategy.stop_loss_distance = *stop;
            config.strategy.take_profit_distance = *target;
            config.strategy.risk_percent = *risk;
            config.run.max_periods_open = *hold;
            Some(config)
        })
        .collect()
    }

    pub fn total_combinations(&self) -> usize {
        use itertools::iproduct;
        iproduct!(&self.stop_loss_distances, &self.take_profit_distances)
            .filter(|(stop, target)| target > stop)
            .count()
            * self.lookbacks.len()
            * self.range_thresholds.len()
            * self.risk_percents.len()
            * self.max_periods_open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "strategy": {
                    "lookback_period": 8,
                    "range_threshold_value": 0.003,
                    "risk_percent": 2.0
                },
                "run": { "starting_equity": 25000.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.strategy.range.lookback_period, 8);
        assert_eq!(config.strategy.risk_percent, 2.0);
        assert_eq!(config.run.starting_equity, 25_000.0);
        // Untouched sections keep their defaults
        assert_eq!(config.run.max_periods_open, 10);
        assert_eq!(config.instrument.symbol, "EURUSD");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.strategy.risk_percent = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.run.max_drawdown_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.strategy.range.lookback_period = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.run.interval_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grid_expansion_skips_inverted_exits() {
        let grid = GridParams {
            lookbacks: vec![6, 10],
            range_thresholds: vec![0.003],
            stop_loss_distances: vec![0.001, 0.003],
            take_profit_distances: vec![0.002],
            risk_percents: vec![1.0],
            max_periods_open: vec![10],
        };

        let configs = grid.generate_configs(&Config::default());
        // stop 0.003 / target 0.002 cells are dropped
        assert_eq!(configs.len(), 2);
        assert_eq!(configs.len(), grid.total_combinations());
        for config in &configs {
            assert!(config.strategy.take_profit_distance > config.strategy.stop_loss_distance);
        }
    }

    #[test]
    fn test_threshold_mode_parses_from_json() {
        let config: Config = serde_json::from_str(
            r#"{ "strategy": { "range_threshold_mode": "atr", "atr_multiplier": 2.5 } }"#,
        )
        .unwrap();
        assert_eq!(
            config.strategy.range.range_threshold_mode,
            crate::range::ThresholdMode::Atr
        );
        assert_eq!(config.strategy.range.atr_multiplier, 2.5);
    }
}
