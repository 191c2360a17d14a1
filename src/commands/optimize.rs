//! Optimize command implementation with progress tracking

use anyhow::Result;
use hover_breakout::config::GridParams;
use hover_breakout::optimizer::Optimizer;
use hover_breakout::Config;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

pub fn run(
    config_path: String,
    data_override: Option<String>,
    sort_by: String,
    top: usize,
    full: bool,
    sequential: bool,
) -> Result<()> {
    info!("Starting optimization");

    let mut config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    if let Some(path) = data_override {
        config.data.data_file = Some(path);
    }

    let grid = match &config.grid {
        Some(grid) => grid.clone(),
        None if full => GridParams::full(),
        None => GridParams::quick(),
    };
    let configs = grid.generate_configs(&config);
    if configs.is_empty() {
        anyhow::bail!("Grid expanded to zero valid parameter combinations");
    }

    let bars = super::backtest::load_bars(&config)?;
    info!(
        "Optimizing over {} bars, {} combinations",
        bars.len(),
        configs.len()
    );

    println!("\n{}", "=".repeat(60));
    println!("PARAMETER OPTIMIZATION");
    println!("{}", "=".repeat(60));
    println!("Combinations:   {}", configs.len());
    println!("Bars:           {}", bars.len());
    println!("Sort by:        {}", sort_by);
    println!("{}\n", "-".repeat(60));

    let mut results = if sequential {
        Optimizer::optimize_sequential(&configs, &bars)
    } else {
        let progress = ProgressBar::new(configs.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
        );
        let results = Optimizer::optimize_with_progress(&configs, &bars, &progress);
        progress.finish_with_message("done");
        results
    };

    Optimizer::sort_results(&mut results, &sort_by);

    println!(
        "{:>4} {:>9} {:>10} {:>10} {:>10} {:>12} {:>8} {:>9} {:>7}",
        "#", "lookback", "threshold", "stop", "target", "hold", "score", "profit", "trades"
    );
    println!("{}", "-".repeat(88));
    for (rank, result) in results.iter().take(top).enumerate() {
        println!(
            "{:>4} {:>9.0} {:>10.4} {:>10.4} {:>10.4} {:>12.0} {:>8.3} {:>9.2} {:>7}",
            rank + 1,
            result.params["lookback"],
            result.params["range_threshold"],
            result.params["stop_loss"],
            result.params["take_profit"],
            result.params["max_periods_open"],
            result.score,
            result.net_profit,
            result.total_trades
        );
    }
    println!("{}", "=".repeat(88));

    if let Some(best) = results.first() {
        println!("\nBest parameters ({}):", sort_by);
        let mut keys: Vec<&String> = best.params.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {:<18} {}", key, best.params[key]);
        }
        println!("  {:<18} {:.4}", "score", best.score);
        println!("  {:<18} {:.2}", "net_profit", best.net_profit);
        println!("  {:<18} {:.2}%", "max_drawdown", best.max_drawdown_pct);
        println!("  {:<18} {:.2}%", "win_rate", best.win_rate);
    } else {
        println!("\nNo results produced (all grid cells failed)");
    }

    info!("Optimization completed: {} results", results.len());
    Ok(())
}
