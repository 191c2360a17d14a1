//! Backtest command implementation

use anyhow::Result;
use hover_breakout::backtest::Backtester;
use hover_breakout::report::{self, MonthlyTable};
use hover_breakout::types::Bar;
use hover_breakout::{data, Config};
use std::path::Path;
use tracing::{info, warn};

/// Load the configured data file, falling back to the seeded synthetic walk
pub(crate) fn load_bars(config: &Config) -> Result<Vec<Bar>> {
    match &config.data.data_file {
        Some(path) if Path::new(path).exists() => data::load_csv(path),
        Some(path) => {
            warn!(
                "Data file {} not found, generating {} synthetic bars (seed {})",
                path, config.data.synthetic_periods, config.data.random_seed
            );
            Ok(data::synthetic_walk(
                config.data.synthetic_periods,
                config.data.synthetic_start_price,
                config.data.random_seed,
            ))
        }
        None => {
            info!(
                "No data file configured, generating {} synthetic bars (seed {})",
                config.data.synthetic_periods, config.data.random_seed
            );
            Ok(data::synthetic_walk(
                config.data.synthetic_periods,
                config.data.synthetic_start_price,
                config.data.random_seed,
            ))
        }
    }
}

pub fn run(
    config_path: String,
    data_override: Option<String>,
    equity_override: Option<f64>,
    start_override: Option<String>,
    end_override: Option<String>,
) -> Result<()> {
    info!("Starting backtest");

    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(path) = data_override {
        info!("Overriding data file to: {}", path);
        config.data.data_file = Some(path);
    }
    if let Some(equity) = equity_override {
        info!("Overriding starting equity to: {:.2}", equity);
        config.run.starting_equity = equity;
    }
    config.validate()?;

    let start = start_override.as_deref().map(data::parse_date).transpose()?;
    let end = end_override.as_deref().map(data::parse_date).transpose()?;

    let bars = load_bars(&config)?;
    let bars = data::filter_bars_by_date(bars, start, end);
    if bars.is_empty() {
        anyhow::bail!("No bars to backtest after date filtering");
    }
    info!("Backtesting {} bars", bars.len());

    let backtester = Backtester::new(config.clone());
    let result = backtester.run(&bars)?;

    println!("\n{}", report::render_summary(&result, config.run.starting_equity));
    println!("{}", MonthlyTable::from_trades(&result.trades).render());

    // Persist the trade log and equity curve for the reporting layer
    std::fs::create_dir_all(&config.data.results_dir)?;
    let trades_path = Path::new(&config.data.results_dir).join("trades.csv");
    let equity_path = Path::new(&config.data.results_dir).join("equity.csv");
    report::save_trades_csv(&trades_path, &result.trades)?;
    report::save_equity_csv(&equity_path, &result.equity_curve)?;
    info!(
        "Saved {} trades to {} and equity curve to {}",
        result.trades.len(),
        trades_path.display(),
        equity_path.display()
    );

    info!("Backtest completed successfully");
    Ok(())
}
