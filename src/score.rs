//! Composite optimization score over a completed run
//!
//! The score blends trade density, monthly profit ratio and relative
//! drawdown into one weighted objective. It is the value the grid search
//! maximizes, scaled by 100 to keep existing tuned weight sets meaningful.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EquityPoint, TradeRecord};

/// Relative weights of the score components; normalized before use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub density: f64,
    pub profit: f64,
    pub drawdown: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            density: 0.3,
            profit: 0.5,
            drawdown: 0.2,
        }
    }
}

impl ScoreWeights {
    /// Scale the weights to sum to one. A non-positive sum zeroes all
    /// weights, which zeroes the score.
    pub fn normalized(&self) -> ScoreWeights {
        let sum = self.density + self.profit + self.drawdown;
        if sum <= 0.0 {
            return ScoreWeights {
                density: 0.0,
                profit: 0.0,
                drawdown: 0.0,
            };
        }
        ScoreWeights {
            density: self.density / sum,
            profit: self.profit / sum,
            drawdown: self.drawdown / sum,
        }
    }
}

/// Whole-month difference between two instants, partial months truncated
/// downward, floored at one so short runs never divide by zero.
pub fn months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    if end <= start {
        return 1;
    }
    let mut months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(1)
}

/// Largest peak-to-trough decline over the curve, as a fraction of the peak
pub fn relative_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - point.equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Score a completed run.
///
/// `trade_density` is trades per evaluated period; `monthly_profit_ratio`
/// is net profit over starting equity, per whole month of run time;
/// `relative_drawdown` comes from the equity curve, not the trade log.
#[allow(clippy::too_many_arguments)]
pub fn score(
    trade_log: &[TradeRecord],
    equity_curve: &[EquityPoint],
    total_periods: usize,
    starting_equity: f64,
    run_start: DateTime<Utc>,
    run_end: DateTime<Utc>,
    weights: &ScoreWeights,
) -> f64 {
    let w = weights.normalized();

    let trade_density = if total_periods == 0 {
        0.0
    } else {
        trade_log.len() as f64 / total_periods as f64
    };

    let monthly_profit_ratio = if starting_equity <= 0.0 {
        0.0
    } else {
        let net_profit: f64 = trade_log.iter().map(|t| t.profit).sum();
        let months = months_between(run_start, run_end) as f64;
        (net_profit / starting_equity) / months
    };

    let drawdown = relative_drawdown(equity_curve);

    100.0 * (trade_density * w.density + monthly_profit_ratio * w.profit - drawdown * w.drawdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, ExitReason};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn trade(profit: f64) -> TradeRecord {
        TradeRecord {
            id: 1,
            direction: Direction::Long,
            entry_price: 1.1,
            exit_price: 1.1,
            stop_loss: 1.09,
            take_profit: 1.12,
            volume: 0.1,
            risk_money: 100.0,
            open_time: at(2024, 1, 2),
            close_time: at(2024, 1, 3),
            profit,
            exit_reason: ExitReason::TakeProfit,
        }
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                time: at(2024, 1, 1) + chrono::Duration::hours(i as i64),
                equity,
            })
            .collect()
    }

    #[test]
    fn test_months_between_truncates_partial_months() {
        assert_eq!(months_between(at(2024, 1, 15), at(2024, 1, 20)), 1);
        assert_eq!(months_between(at(2024, 1, 15), at(2024, 3, 14)), 1);
        assert_eq!(months_between(at(2024, 1, 15), at(2024, 3, 15)), 2);
        assert_eq!(months_between(at(2024, 1, 15), at(2025, 1, 15)), 12);
        // Floor of one, even for inverted inputs
        assert_eq!(months_between(at(2024, 3, 1), at(2024, 1, 1)), 1);
    }

    #[test]
    fn test_relative_drawdown() {
        let dd = relative_drawdown(&curve(&[10_000.0, 11_000.0, 8_800.0, 9_500.0, 12_000.0]));
        // Worst decline: 11000 -> 8800
        assert_relative_eq!(dd, 0.2, epsilon = 1e-9);

        assert_eq!(relative_drawdown(&[]), 0.0);
        assert_eq!(relative_drawdown(&curve(&[10_000.0, 10_500.0])), 0.0);
    }

    #[test]
    fn test_weights_normalize() {
        let w = ScoreWeights {
            density: 1.0,
            profit: 2.0,
            drawdown: 1.0,
        }
        .normalized();
        assert_relative_eq!(w.density, 0.25, epsilon = 1e-9);
        assert_relative_eq!(w.profit, 0.5, epsilon = 1e-9);
        assert_relative_eq!(w.drawdown, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_weight_sum_zeroes_score() {
        let trades = vec![trade(500.0)];
        let equity = curve(&[10_000.0, 10_500.0]);
        let weights = ScoreWeights {
            density: 0.0,
            profit: 0.0,
            drawdown: 0.0,
        };
        let s = score(
            &trades,
            &equity,
            100,
            10_000.0,
            at(2024, 1, 1),
            at(2024, 6, 1),
            &weights,
        );
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_zero_periods_zeroes_density() {
        let s = score(
            &[],
            &[],
            0,
            10_000.0,
            at(2024, 1, 1),
            at(2024, 6, 1),
            &ScoreWeights::default(),
        );
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_score_components() {
        // 10 trades over 100 periods, +1000 over 2 whole months, 10% drawdown
        let trades: Vec<TradeRecord> = (0..10).map(|_| trade(100.0)).collect();
        let equity = curve(&[10_000.0, 11_000.0, 9_900.0, 11_000.0]);
        let weights = ScoreWeights {
            density: 0.3,
            profit: 0.5,
            drawdown: 0.2,
        };

        let s = score(
            &trades,
            &equity,
            100,
            10_000.0,
            at(2024, 1, 1),
            at(2024, 3, 1),
            &weights,
        );

        let expected = 100.0 * (0.1 * 0.3 + (0.1 / 2.0) * 0.5 - 0.1 * 0.2);
        assert_relative_eq!(s, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_density_monotonicity() {
        let equity = curve(&[10_000.0, 10_100.0]);
        let weights = ScoreWeights::default();

        let mut previous = f64::NEG_INFINITY;
        for n in [1usize, 5, 10, 20] {
            let trades: Vec<TradeRecord> = (0..n).map(|_| trade(0.0)).collect();
            let s = score(
                &trades,
                &equity,
                100,
                10_000.0,
                at(2024, 1, 1),
                at(2024, 2, 1),
                &weights,
            );
            assert!(s > previous);
            previous = s;
        }
    }
}
