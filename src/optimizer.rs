//! Parallel grid search over strategy parameters
//!
//! Runs one backtest per expanded grid cell on the rayon pool and collects
//! the composite score alongside the headline run statistics. Cells share
//! the immutable bar data; every cell is independent and deterministic.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::backtest::Backtester;
use crate::config::Config;
use crate::series::SeriesEntry;

/// Outcome of one parameter combination
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub params: HashMap<String, f64>,
    pub score: f64,
    pub net_profit: f64,
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub profit_factor: f64,
}

/// The tunable parameters of a config, flattened for result tables
pub fn extract_params(config: &Config) -> HashMap<String, f64> {
    let mut params = HashMap::new();
    params.insert(
        "lookback".to_string(),
        config.strategy.range.lookback_period as f64,
    );
    params.insert(
        "range_threshold".to_string(),
        config.strategy.range.range_threshold_value,
    );
    params.insert("stop_loss".to_string(), config.strategy.stop_loss_distance);
    params.insert(
        "take_profit".to_string(),
        config.strategy.take_profit_distance,
    );
    params.insert("risk_percent".to_string(), config.strategy.risk_percent);
    params.insert(
        "max_periods_open".to_string(),
        config.run.max_periods_open as f64,
    );
    params
}

/// Grid search runner
pub struct Optimizer;

impl Optimizer {
    fn run_cell<E: SeriesEntry>(config: &Config, entries: &[E]) -> Option<OptimizationResult> {
        let backtester = Backtester::new(config.clone());
        let report = match backtester.run(entries) {
            Ok(report) => report,
            Err(e) => {
                warn!("Skipping grid cell, run failed: {}", e);
                return None;
            }
        };

        Some(OptimizationResult {
            params: extract_params(config),
            score: report.score,
            net_profit: report.stats.net_profit,
            max_drawdown_pct: report.stats.max_drawdown_pct,
            win_rate: report.stats.win_rate,
            total_trades: report.stats.total_trades,
            profit_factor: report.stats.profit_factor,
        })
    }

    /// Run every config against the same data in parallel
    pub fn optimize<E: SeriesEntry + Sync>(
        configs: &[Config],
        entries: &[E],
    ) -> Vec<OptimizationResult> {
        info!("Testing {} parameter combinations", configs.len());

        configs
            .par_iter()
            .filter_map(|config| Self::run_cell(config, entries))
            .collect()
    }

    /// Like `optimize`, ticking a progress bar per completed cell
    pub fn optimize_with_progress<E: SeriesEntry + Sync>(
        configs: &[Config],
        entries: &[E],
        progress_bar: &ProgressBar,
    ) -> Vec<OptimizationResult> {
        info!(
            "Testing {} parameter combinations with progress tracking",
            configs.len()
        );

        configs
            .par_iter()
            .filter_map(|config| {
                let result = Self::run_cell(config, entries);
                progress_bar.inc(1);
                result
            })
            .collect()
    }

    /// Run sequentially; useful when debugging a single cell
    pub fn optimize_sequential<E: SeriesEntry>(
        configs: &[Config],
        entries: &[E],
    ) -> Vec<OptimizationResult> {
        info!(
            "Testing {} parameter combinations sequentially",
            configs.len()
        );

        configs
            .iter()
            .filter_map(|config| Self::run_cell(config, entries))
            .collect()
    }

    /// Sort results best-first by the named metric (default: score)
    pub fn sort_results(results: &mut [OptimizationResult], sort_by: &str) {
        match sort_by {
            "profit" => results.sort_by(|a, b| {
                b.net_profit
                    .partial_cmp(&a.net_profit)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            // Drawdown sorts ascending: less is better
            "drawdown" => results.sort_by(|a, b| {
                a.max_drawdown_pct
                    .partial_cmp(&b.max_drawdown_pct)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            "win_rate" => results.sort_by(|a, b| {
                b.win_rate
                    .partial_cmp(&a.win_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            "trades" => results.sort_by(|a, b| b.total_trades.cmp(&a.total_trades)),
            "profit_factor" => results.sort_by(|a, b| {
                b.profit_factor
                    .partial_cmp(&a.profit_factor)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
            _ => results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }),
        }
    }
}
