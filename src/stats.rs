//! Summary statistics over a completed run

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::score::relative_drawdown;
use crate::types::{EquityPoint, ExitReason, TradeRecord};

/// Aggregate trade and equity statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub stop_loss_exits: usize,
    pub take_profit_exits: usize,
    pub time_exits: usize,
    pub drawdown_flattens: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Mean per-trade profit as a percentage of the money risked
    pub expectancy_pct: f64,
    pub avg_win: f64,
    /// Average losing trade, reported as a positive magnitude
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub net_profit: f64,
    pub final_equity: f64,
    pub max_drawdown_pct: f64,
    /// Mean over standard deviation of per-trade profits
    pub sharpe_ratio: f64,
}

impl RunStats {
    pub fn from_run(
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        starting_equity: f64,
    ) -> Self {
        let winning: Vec<&TradeRecord> = trades.iter().filter(|t| t.profit > 0.0).collect();
        let losing: Vec<&TradeRecord> = trades.iter().filter(|t| t.profit < 0.0).collect();

        let win_rate = if !trades.is_empty() {
            (winning.len() as f64 / trades.len() as f64) * 100.0
        } else {
            0.0
        };

        let gross_profits: f64 = winning.iter().map(|t| t.profit).sum();
        let gross_losses: f64 = losing.iter().map(|t| t.profit.abs()).sum();

        let profit_factor = if gross_losses > 0.0 {
            gross_profits / gross_losses
        } else if gross_profits > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if !winning.is_empty() {
            gross_profits / winning.len() as f64
        } else {
            0.0
        };
        let avg_loss = if !losing.is_empty() {
            gross_losses / losing.len() as f64
        } else {
            0.0
        };

        let largest_win = trades.iter().map(|t| t.profit).fold(0.0, f64::max);
        let largest_loss = trades.iter().map(|t| t.profit).fold(0.0, f64::min);

        let r_multiples: Vec<f64> = trades
            .iter()
            .filter(|t| t.risk_money > 0.0)
            .map(|t| t.profit / t.risk_money * 100.0)
            .collect();
        let expectancy_pct = if r_multiples.is_empty() {
            0.0
        } else {
            r_multiples.iter().sum::<f64>() / r_multiples.len() as f64
        };

        let profits: Vec<f64> = trades.iter().map(|t| t.profit).collect();
        let sharpe_ratio = if profits.len() > 1 {
            let mean = profits.iter().mean();
            let std_dev = profits.iter().std_dev();
            if std_dev > 0.0 {
                mean / std_dev
            } else {
                0.0
            }
        } else {
            0.0
        };

        let net_profit: f64 = trades.iter().map(|t| t.profit).sum();

        let mut stats = RunStats {
            total_trades: trades.len(),
            winning_trades: winning.len(),
            losing_trades: losing.len(),
            stop_loss_exits: 0,
            take_profit_exits: 0,
            time_exits: 0,
            drawdown_flattens: 0,
            win_rate,
            profit_factor,
            expectancy_pct,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            net_profit,
            final_equity: starting_equity + net_profit,
            max_drawdown_pct: relative_drawdown(equity_curve) * 100.0,
            sharpe_ratio,
        };

        for trade in trades {
            match trade.exit_reason {
                ExitReason::StopLoss => stats.stop_loss_exits += 1,
                ExitReason::TakeProfit => stats.take_profit_exits += 1,
                ExitReason::TimeExit => stats.time_exits += 1,
                ExitReason::DrawdownFlatten => stats.drawdown_flattens += 1,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn trade(profit: f64, reason: ExitReason) -> TradeRecord {
        TradeRecord {
            id: 1,
            direction: Direction::Long,
            entry_price: 1.1,
            exit_price: 1.1,
            stop_loss: 1.09,
            take_profit: 1.12,
            volume: 0.1,
            risk_money: 200.0,
            open_time: at(1),
            close_time: at(2),
            profit,
            exit_reason: reason,
        }
    }

    #[test]
    fn test_empty_run() {
        let stats = RunStats::from_run(&[], &[], 10_000.0);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.profit_factor, 0.0);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_relative_eq!(stats.final_equity, 10_000.0);
    }

    #[test]
    fn test_counts_and_ratios() {
        let trades = vec![
            trade(300.0, ExitReason::TakeProfit),
            trade(100.0, ExitReason::TakeProfit),
            trade(-200.0, ExitReason::StopLoss),
            trade(-50.0, ExitReason::TimeExit),
            trade(-150.0, ExitReason::DrawdownFlatten),
        ];
        let stats = RunStats::from_run(&trades, &[], 10_000.0);

        assert_eq!(stats.total_trades, 5);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 3);
        assert_eq!(stats.stop_loss_exits, 1);
        assert_eq!(stats.take_profit_exits, 2);
        assert_eq!(stats.time_exits, 1);
        assert_eq!(stats.drawdown_flattens, 1);

        assert_relative_eq!(stats.win_rate, 40.0, epsilon = 1e-9);
        // 400 gross profit vs 400 gross loss
        assert_relative_eq!(stats.profit_factor, 1.0, epsilon = 1e-9);
        assert_relative_eq!(stats.avg_win, 200.0, epsilon = 1e-9);
        assert_relative_eq!(stats.avg_loss, 400.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(stats.largest_win, 300.0, epsilon = 1e-9);
        assert_relative_eq!(stats.largest_loss, -200.0, epsilon = 1e-9);
        assert_relative_eq!(stats.net_profit, 0.0, epsilon = 1e-9);
        assert_relative_eq!(stats.final_equity, 10_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_profit_factor_without_losses() {
        let trades = vec![trade(100.0, ExitReason::TakeProfit)];
        let stats = RunStats::from_run(&trades, &[], 10_000.0);
        assert!(stats.profit_factor.is_infinite());
    }

    #[test]
    fn test_expectancy_uses_risk_money() {
        // +100 and -50 against 200 risked: mean of +50% and -25%
        let trades = vec![
            trade(100.0, ExitReason::TakeProfit),
            trade(-50.0, ExitReason::StopLoss),
        ];
        let stats = RunStats::from_run(&trades, &[], 10_000.0);
        assert_relative_eq!(stats.expectancy_pct, 12.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sharpe_needs_two_trades() {
        let trades = vec![trade(100.0, ExitReason::TakeProfit)];
        let stats = RunStats::from_run(&trades, &[], 10_000.0);
        assert_eq!(stats.sharpe_ratio, 0.0);

        let trades = vec![
            trade(100.0, ExitReason::TakeProfit),
            trade(50.0, ExitReason::TakeProfit),
        ];
        let stats = RunStats::from_run(&trades, &[], 10_000.0);
        assert!(stats.sharpe_ratio > 0.0);
    }
}
