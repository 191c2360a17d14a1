//! Append-only price series with lookback windows and period-edge detection
//!
//! The series is the single synchronization primitive of a run: range
//! detection and entry decisions are gated on `new_period()`, while exit
//! checks run on every appended update.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::types::{Bar, PriceSample};

/// Errors raised by series access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("out of order data: {incoming} does not advance past {last}")]
    OutOfOrderData {
        last: DateTime<Utc>,
        incoming: DateTime<Utc>,
    },

    #[error("insufficient history: needed {needed}, available {available}")]
    InsufficientHistory { needed: usize, available: usize },
}

/// Accessors shared by every entry type the series can hold
pub trait SeriesEntry: Clone {
    fn timestamp(&self) -> DateTime<Utc>;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    /// Most recent traded price of the entry (close for bars)
    fn last_price(&self) -> f64;
}

impl SeriesEntry for Bar {
    fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn last_price(&self) -> f64 {
        self.close
    }
}

impl SeriesEntry for PriceSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.time
    }

    fn high(&self) -> f64 {
        self.price
    }

    fn low(&self) -> f64 {
        self.price
    }

    fn last_price(&self) -> f64 {
        self.price
    }
}

/// Decides when an appended entry opens a new evaluation period.
///
/// The interval variant is driven by the data's own timestamps, never the
/// system clock, so replays are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodClock {
    /// Every appended entry opens a new period
    EveryBar,
    /// A new period opens when the data clock has advanced by at least `every`
    /// since the last period; the first appended entry anchors the clock
    Interval {
        every: Duration,
        last_fire: Option<DateTime<Utc>>,
    },
}

impl PeriodClock {
    pub fn interval(every: Duration) -> Self {
        PeriodClock::Interval {
            every,
            last_fire: None,
        }
    }

    fn fire(&mut self, at: DateTime<Utc>) -> bool {
        match self {
            PeriodClock::EveryBar => true,
            PeriodClock::Interval { every, last_fire } => match last_fire {
                None => {
                    *last_fire = Some(at);
                    true
                }
                Some(prev) if at - *prev >= *every => {
                    *last_fire = Some(at);
                    true
                }
                Some(_) => false,
            },
        }
    }
}

/// Time-ordered, append-only sequence of bars or price samples
#[derive(Debug, Clone)]
pub struct PriceSeries<E> {
    entries: Vec<E>,
    clock: PeriodClock,
    new_period: bool,
}

impl<E: SeriesEntry> PriceSeries<E> {
    pub fn new(clock: PeriodClock) -> Self {
        PriceSeries {
            entries: Vec::new(),
            clock,
            new_period: false,
        }
    }

    /// Append an entry. Timestamps must be strictly increasing.
    pub fn append(&mut self, entry: E) -> Result<(), SeriesError> {
        if let Some(last) = self.entries.last() {
            if entry.timestamp() <= last.timestamp() {
                return Err(SeriesError::OutOfOrderData {
                    last: last.timestamp(),
                    incoming: entry.timestamp(),
                });
            }
        }
        self.new_period = self.clock.fire(entry.timestamp());
        self.entries.push(entry);
        Ok(())
    }

    /// True when the most recent append opened a new evaluation period
    pub fn new_period(&self) -> bool {
        self.new_period
    }

    /// Most recently appended entry (the one under evaluation)
    pub fn latest(&self) -> Option<&E> {
        self.entries.last()
    }

    /// Last `n` completed entries, oldest to newest. The newest appended
    /// entry is still forming and is never part of the window.
    pub fn window(&self, n: usize) -> Result<&[E], SeriesError> {
        self.window_offset(n, 0)
    }

    /// Like `window`, but the window ends `skip` completed entries before
    /// the newest appended entry.
    pub fn window_offset(&self, n: usize, skip: usize) -> Result<&[E], SeriesError> {
        let completed = self.entries.len().saturating_sub(1);
        let needed = n + skip;
        if completed < needed {
            return Err(SeriesError::InsufficientHistory {
                needed,
                available: completed,
            });
        }
        let end = completed - skip;
        Ok(&self.entries[end - n..end])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
