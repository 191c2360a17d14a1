//! Hover breakout simulator - main entry point
//!
//! This binary provides two subcommands:
//! - backtest: Replay a bar series through the breakout engine
//! - optimize: Grid-search strategy parameters in parallel

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "hover-breakout")]
#[command(about = "Range hover breakout strategy with backtesting and parameter optimization", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a backtest over a bar series
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/eurusd_m30.json")]
        config: String,

        /// CSV data file (overrides config file)
        #[arg(short, long)]
        data: Option<String>,

        /// Starting equity (overrides config file)
        #[arg(long)]
        equity: Option<f64>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Optimize strategy parameters (grid search from config)
    Optimize {
        /// Path to configuration file with grid section
        #[arg(short, long, default_value = "configs/eurusd_m30.json")]
        config: String,

        /// CSV data file (overrides config file)
        #[arg(short, long)]
        data: Option<String>,

        /// Sort results by metric (score, profit, drawdown, win_rate, trades, profit_factor)
        #[arg(long, default_value = "score")]
        sort_by: String,

        /// Number of top results to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Use the full grid instead of the quick one when the config has none
        #[arg(long)]
        full: bool,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // Log file naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // For the optimizer: only log to file, keep console clean for the
        // progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Backtest { .. } => ("backtest", false),
        // File-only for a clean progress bar
        Commands::Optimize { .. } => ("optimize", true),
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Backtest {
            config,
            data,
            equity,
            start,
            end,
        } => commands::backtest::run(config, data, equity, start, end),

        Commands::Optimize {
            config,
            data,
            sort_by,
            top,
            full,
            sequential,
        } => commands::optimize::run(config, data, sort_by, top, full, sequential),
    }
}
