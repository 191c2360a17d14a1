//! Backtesting engine
//!
//! Replays an ordered sequence of bars or price samples through the range
//! detector, breakout engine and position ledger, recording the realized
//! equity curve. Each update is processed to completion before the next is
//! admitted: exit checks run first, then the entry decision on new-period
//! edges.

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::engine::BreakoutEngine;
use crate::ledger::{MarketSnapshot, PositionLedger, TimeExitRule};
use crate::score::score;
use crate::series::{PeriodClock, PriceSeries, SeriesEntry, SeriesError};
use crate::stats::RunStats;
use crate::types::{AccountState, EquityPoint, Position, TradeRecord};

/// Everything a completed run produces
#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestReport {
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub stats: RunStats,
    pub score: f64,
    /// Evaluation periods seen over the run (new-period edges)
    pub total_periods: usize,
    /// Positions still open when the data ran out
    pub unsettled_positions: Vec<Position>,
}

/// Drives one run of the simulator over caller-provided updates
pub struct Backtester {
    config: Config,
}

impl Backtester {
    pub fn new(config: Config) -> Self {
        Backtester { config }
    }

    fn period_clock(&self) -> PeriodClock {
        match self.config.run.interval_seconds {
            Some(seconds) => PeriodClock::interval(chrono::Duration::seconds(seconds)),
            None => PeriodClock::EveryBar,
        }
    }

    fn time_exit_rule(&self) -> TimeExitRule {
        match self.config.run.interval_seconds {
            Some(seconds) => TimeExitRule::Elapsed(chrono::Duration::seconds(
                seconds * self.config.run.max_periods_open as i64,
            )),
            None => TimeExitRule::Periods(self.config.run.max_periods_open),
        }
    }

    /// Replay `entries` in order. Fails with `OutOfOrderData` if the input
    /// violates the ordering contract; warm-up periods with insufficient
    /// history are skipped, not errors.
    pub fn run<E: SeriesEntry>(&self, entries: &[E]) -> Result<BacktestReport, SeriesError> {
        let engine = BreakoutEngine::new(self.config.strategy.clone());
        let mut series = PriceSeries::new(self.period_clock());
        let mut ledger = PositionLedger::new(
            self.time_exit_rule(),
            self.config.run.max_drawdown_fraction,
            self.config.instrument.contract_multiplier,
        );
        let mut account = AccountState::new(self.config.run.starting_equity);
        let mut equity_curve = Vec::with_capacity(entries.len());
        let mut total_periods = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            series.append(entry.clone())?;
            let snapshot = MarketSnapshot::from_entry(index, entry);

            // Exits first: a position opened this update is not evaluated
            // for exit until the next one.
            ledger.tick(&snapshot, &mut account);

            if series.new_period() {
                total_periods += 1;
                match engine.evaluate(
                    &series,
                    snapshot.price,
                    account.equity,
                    &self.config.instrument,
                    ledger.open_count(),
                ) {
                    Ok(Some(intent)) => {
                        ledger.open(&intent, snapshot.time, index);
                    }
                    Ok(None) => {}
                    // Warm-up: not enough completed history yet
                    Err(SeriesError::InsufficientHistory { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            equity_curve.push(EquityPoint {
                time: snapshot.time,
                equity: account.equity,
            });
        }

        let trades = ledger.trade_log().to_vec();
        let run_score = match (entries.first(), entries.last()) {
            (Some(first), Some(last)) => score(
                &trades,
                &equity_curve,
                total_periods,
                self.config.run.starting_equity,
                first.timestamp(),
                last.timestamp(),
                &self.config.score_weights,
            ),
            _ => 0.0,
        };
        let stats = RunStats::from_run(&trades, &equity_curve, self.config.run.starting_equity);

        info!(
            "Run complete: {} periods, {} trades, final equity {:.2}, score {:.4}",
            total_periods,
            trades.len(),
            account.equity,
            run_score
        );

        Ok(BacktestReport {
            trades,
            equity_curve,
            stats,
            score: run_score,
            total_periods,
            unsettled_positions: ledger.open_positions().to_vec(),
        })
    }
}
