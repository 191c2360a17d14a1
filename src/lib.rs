//! Hover Breakout
//!
//! A bar/interval-driven breakout trading simulator: detects tight
//! consolidation ("hover") ranges, triggers directional entries on breakout,
//! sizes positions from account risk, enforces time and drawdown exits, and
//! scores completed runs for parameter optimization.

pub mod backtest;
pub mod config;
pub mod data;
pub mod engine;
pub mod ledger;
pub mod optimizer;
pub mod range;
pub mod report;
pub mod score;
pub mod series;
pub mod sizing;
pub mod stats;
pub mod types;

pub use config::Config;
pub use types::*;
