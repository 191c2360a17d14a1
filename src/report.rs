//! Run reporting: CSV exports, monthly profit table and console summary

use anyhow::{Context, Result};
use chrono::Datelike;
use std::collections::BTreeMap;
use std::path::Path;

use crate::backtest::BacktestReport;
use crate::types::{EquityPoint, TradeRecord};

/// Write the trade log to CSV, one row per settled trade
pub fn save_trades_csv(path: impl AsRef<Path>, trades: &[TradeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref()).context("Failed to create trades CSV")?;
    writer.write_record([
        "open_time",
        "close_time",
        "direction",
        "entry_price",
        "exit_price",
        "stop_loss",
        "take_profit",
        "volume",
        "profit",
        "exit_reason",
    ])?;

    for trade in trades {
        writer.write_record([
            trade.open_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            trade.close_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            trade.direction.to_string(),
            format!("{:.5}", trade.entry_price),
            format!("{:.5}", trade.exit_price),
            format!("{:.5}", trade.stop_loss),
            format!("{:.5}", trade.take_profit),
            format!("{:.2}", trade.volume),
            format!("{:.2}", trade.profit),
            trade.exit_reason.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the realized equity curve to CSV
pub fn save_equity_csv(path: impl AsRef<Path>, curve: &[EquityPoint]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref()).context("Failed to create equity CSV")?;
    writer.write_record(["time", "equity"])?;

    for point in curve {
        writer.write_record([
            point.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.2}", point.equity),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Year-month key for the monthly table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

/// Per-month aggregation of the trade log
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyProfit {
    pub net_profit: f64,
    pub trade_count: usize,
    pub winning_trades: usize,
}

/// Trade profits bucketed by close month
#[derive(Debug, Clone, Default)]
pub struct MonthlyTable {
    data: BTreeMap<YearMonth, MonthlyProfit>,
}

impl MonthlyTable {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        let mut data: BTreeMap<YearMonth, MonthlyProfit> = BTreeMap::new();

        for trade in trades {
            let key = YearMonth {
                year: trade.close_time.year(),
                month: trade.close_time.month(),
            };
            let entry = data.entry(key).or_default();
            entry.net_profit += trade.profit;
            entry.trade_count += 1;
            if trade.profit > 0.0 {
                entry.winning_trades += 1;
            }
        }

        MonthlyTable { data }
    }

    pub fn get(&self, year: i32, month: u32) -> Option<&MonthlyProfit> {
        self.data.get(&YearMonth { year, month })
    }

    pub fn total_profit(&self) -> f64 {
        self.data.values().map(|m| m.net_profit).sum()
    }

    /// Render one row per month with profit, trade count and win rate
    pub fn render(&self) -> String {
        if self.data.is_empty() {
            return "No trades to display in the monthly table.".to_string();
        }

        let mut output = String::new();
        output.push_str(&format!("{}\n", "=".repeat(60)));
        output.push_str("MONTHLY PROFIT\n");
        output.push_str(&format!("{}\n", "-".repeat(60)));
        output.push_str(&format!(
            "{:>7} {:>14} {:>10} {:>12}\n",
            "Month", "Profit", "Trades", "Win Rate"
        ));

        for (key, month) in &self.data {
            let win_rate = if month.trade_count > 0 {
                month.winning_trades as f64 / month.trade_count as f64 * 100.0
            } else {
                0.0
            };
            output.push_str(&format!(
                "{:>4}-{:02} {:>14.2} {:>10} {:>11.1}%\n",
                key.year, key.month, month.net_profit, month.trade_count, win_rate
            ));
        }

        let profitable = self.data.values().filter(|m| m.net_profit > 0.0).count();
        output.push_str(&format!("{}\n", "-".repeat(60)));
        output.push_str(&format!(
            "Total: {:.2} over {} months ({} profitable)\n",
            self.total_profit(),
            self.data.len(),
            profitable
        ));
        output.push_str(&format!("{}\n", "=".repeat(60)));
        output
    }
}

/// Console summary block for a completed run
pub fn render_summary(report: &BacktestReport, starting_equity: f64) -> String {
    let stats = &report.stats;
    let mut output = String::new();

    output.push_str(&format!("{}\n", "=".repeat(60)));
    output.push_str("BACKTEST RESULTS\n");
    output.push_str(&format!("{}\n", "=".repeat(60)));
    output.push_str(&format!("Starting Equity:    {:.2}\n", starting_equity));
    output.push_str(&format!("Final Equity:       {:.2}\n", stats.final_equity));
    output.push_str(&format!("Net Profit:         {:.2}\n", stats.net_profit));
    output.push_str(&format!("Score:              {:.4}\n", report.score));
    output.push_str(&format!("Periods Evaluated:  {}\n", report.total_periods));
    output.push_str(&format!("{}\n", "-".repeat(60)));
    output.push_str(&format!("Total Trades:       {}\n", stats.total_trades));
    output.push_str(&format!("Win Rate:           {:.2}%\n", stats.win_rate));
    output.push_str(&format!("Profit Factor:      {:.2}\n", stats.profit_factor));
    output.push_str(&format!("Expectancy:         {:.2}%\n", stats.expectancy_pct));
    output.push_str(&format!("Sharpe Ratio:       {:.2}\n", stats.sharpe_ratio));
    output.push_str(&format!("Max Drawdown:       {:.2}%\n", stats.max_drawdown_pct));
    output.push_str(&format!("{}\n", "-".repeat(60)));
    output.push_str(&format!("Average Win:        {:.2}\n", stats.avg_win));
    output.push_str(&format!("Average Loss:       {:.2}\n", stats.avg_loss));
    output.push_str(&format!("Largest Win:        {:.2}\n", stats.largest_win));
    output.push_str(&format!("Largest Loss:       {:.2}\n", stats.largest_loss));
    output.push_str(&format!(
        "Exits:              {} stop / {} target / {} time / {} flatten\n",
        stats.stop_loss_exits, stats.take_profit_exits, stats.time_exits, stats.drawdown_flattens
    ));
    if !report.unsettled_positions.is_empty() {
        output.push_str(&format!(
            "Still Open:         {}\n",
            report.unsettled_positions.len()
        ));
    }
    output.push_str(&format!("{}\n", "=".repeat(60)));
    output
}
