//! Open-position tracking, exit rules and trade settlement
//!
//! The ledger is ticked on every price update. Exit checks run in a fixed
//! order: stop/target fills against the update's traded extremes, then the
//! time-based forced exit, then the portfolio drawdown kill-switch. Equity
//! is realized-only: it moves exactly when a position settles.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::series::SeriesEntry;
use crate::types::{AccountState, Direction, ExitReason, Position, TradeIntent, TradeRecord};

/// Traded extremes and reference price of one update
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot {
    pub time: DateTime<Utc>,
    pub index: usize,
    pub high: f64,
    pub low: f64,
    pub price: f64,
}

impl MarketSnapshot {
    pub fn from_entry<E: SeriesEntry>(index: usize, entry: &E) -> Self {
        MarketSnapshot {
            time: entry.timestamp(),
            index,
            high: entry.high(),
            low: entry.low(),
            price: entry.last_price(),
        }
    }
}

/// When a position is forcibly closed regardless of price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeExitRule {
    /// After this many updates past the open index (bar sampling)
    Periods(usize),
    /// After this much data-clock time past the open (interval sampling)
    Elapsed(Duration),
}

impl TimeExitRule {
    fn due(&self, position: &Position, snapshot: &MarketSnapshot) -> bool {
        match self {
            TimeExitRule::Periods(n) => {
                snapshot.index.saturating_sub(position.open_index) >= *n
            }
            TimeExitRule::Elapsed(elapsed) => snapshot.time - position.open_time >= *elapsed,
        }
    }
}

/// Tracks open positions and settles them into an append-only trade log
#[derive(Debug)]
pub struct PositionLedger {
    time_exit: TimeExitRule,
    max_drawdown_fraction: f64,
    contract_multiplier: f64,
    open: Vec<Position>,
    log: Vec<TradeRecord>,
    next_id: u64,
}

impl PositionLedger {
    pub fn new(
        time_exit: TimeExitRule,
        max_drawdown_fraction: f64,
        contract_multiplier: f64,
    ) -> Self {
        PositionLedger {
            time_exit,
            max_drawdown_fraction,
            contract_multiplier,
            open: Vec::new(),
            log: Vec::new(),
            next_id: 1,
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open
    }

    /// Completed trades in close order
    pub fn trade_log(&self) -> &[TradeRecord] {
        &self.log
    }

    /// Open a position from an intent. Zero-volume intents are a no-op.
    pub fn open(
        &mut self,
        intent: &TradeIntent,
        at_time: DateTime<Utc>,
        at_index: usize,
    ) -> Option<u64> {
        if intent.volume <= 0.0 {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        info!(
            "{} OPENED {} #{}: Entry={:.5}, SL={:.5}, TP={:.5}, Volume={:.2}",
            at_time.format("%Y-%m-%d %H:%M"),
            intent.direction,
            id,
            intent.entry_price,
            intent.stop_loss,
            intent.take_profit,
            intent.volume
        );
        self.open.push(Position {
            id,
            direction: intent.direction,
            entry_price: intent.entry_price,
            stop_loss: intent.stop_loss,
            take_profit: intent.take_profit,
            volume: intent.volume,
            risk_money: intent.risk_money,
            open_time: at_time,
            open_index: at_index,
        });
        Some(id)
    }

    /// Apply exit rules for one update: stop/target fills, time exit, then
    /// the drawdown kill-switch. Runs on every update, not only new periods.
    pub fn tick(&mut self, snapshot: &MarketSnapshot, account: &mut AccountState) {
        // Stop/target fills against the update's extremes. When both levels
        // are touched within one update the stop fills first.
        let mut i = 0;
        while i < self.open.len() {
            let position = &self.open[i];
            let fill = match position.direction {
                Direction::Long => {
                    if snapshot.low <= position.stop_loss {
                        Some((position.stop_loss, ExitReason::StopLoss))
                    } else if snapshot.high >= position.take_profit {
                        Some((position.take_profit, ExitReason::TakeProfit))
                    } else {
                        None
                    }
                }
                Direction::Short => {
                    if snapshot.high >= position.stop_loss {
                        Some((position.stop_loss, ExitReason::StopLoss))
                    } else if snapshot.low <= position.take_profit {
                        Some((position.take_profit, ExitReason::TakeProfit))
                    } else {
                        None
                    }
                }
            };
            if let Some((price, reason)) = fill {
                let position = self.open.remove(i);
                self.close(position, price, reason, snapshot.time, account);
            } else {
                i += 1;
            }
        }

        // Time-based forced exit at the current price
        let mut i = 0;
        while i < self.open.len() {
            if self.time_exit.due(&self.open[i], snapshot) {
                let position = self.open.remove(i);
                self.close(
                    position,
                    snapshot.price,
                    ExitReason::TimeExit,
                    snapshot.time,
                    account,
                );
            } else {
                i += 1;
            }
        }

        // Drawdown kill-switch: flatten everything and rebase the peak
        if account.equity > account.peak_equity {
            account.peak_equity = account.equity;
        }
        if account.peak_equity > 0.0 {
            let drawdown = (account.peak_equity - account.equity) / account.peak_equity;
            if drawdown >= self.max_drawdown_fraction {
                let flattened: Vec<Position> = self.open.drain(..).collect();
                let count = flattened.len();
                for position in flattened {
                    self.close(
                        position,
                        snapshot.price,
                        ExitReason::DrawdownFlatten,
                        snapshot.time,
                        account,
                    );
                }
                warn!(
                    "{} DRAWDOWN LIMIT HIT: {:.2}% >= {:.2}%, flattened {} position(s), peak rebased to {:.2}",
                    snapshot.time.format("%Y-%m-%d %H:%M"),
                    drawdown * 100.0,
                    self.max_drawdown_fraction * 100.0,
                    count,
                    account.equity
                );
                account.peak_equity = account.equity;
            }
        }
    }

    fn close(
        &mut self,
        position: Position,
        exit_price: f64,
        reason: ExitReason,
        at: DateTime<Utc>,
        account: &mut AccountState,
    ) {
        let profit = position.profit_at(exit_price, self.contract_multiplier);
        account.equity += profit;
        info!(
            "{} CLOSED {} #{}: Exit={:.5}, Reason={}, Profit={:.2}",
            at.format("%Y-%m-%d %H:%M"),
            position.direction,
            position.id,
            exit_price,
            reason,
            profit
        );
        self.log.push(TradeRecord {
            id: position.id,
            direction: position.direction,
            entry_price: position.entry_price,
            exit_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            volume: position.volume,
            risk_money: position.risk_money,
            open_time: position.open_time,
            close_time: at,
            profit,
            exit_reason: reason,
        });
    }
}
