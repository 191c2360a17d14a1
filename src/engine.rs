//! Breakout decision engine
//!
//! Each evaluation runs the full Idle -> Armed -> emit cycle: the engine
//! arms when the range detector reports a tight hover this period, emits a
//! sized trade intent when the trigger price clears the range, and falls
//! back to idle otherwise. No state is carried between periods; the range
//! is recomputed fresh from the series every time.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::range::{RangeDetector, RangeDetectorConfig};
use crate::series::{PriceSeries, SeriesEntry, SeriesError};
use crate::sizing::size_volume;
use crate::types::{Direction, InstrumentSpec, TradeIntent};

/// Strategy parameters for the breakout engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    #[serde(flatten)]
    pub range: RangeDetectorConfig,
    /// Stop distance from entry, in price units (or multiples of the mean
    /// bar span with `scale_exits_to_range`)
    pub stop_loss_distance: f64,
    /// Target distance from entry, same units as the stop distance
    pub take_profit_distance: f64,
    /// Interpret the exit distances as multiples of the window's mean bar span
    pub scale_exits_to_range: bool,
    /// Adverse fill offset applied to the trigger price
    pub slippage: f64,
    /// Percent of equity risked per trade
    pub risk_percent: f64,
    /// Permit new entries while positions are open
    pub allow_concurrent_positions: bool,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        BreakoutConfig {
            range: RangeDetectorConfig::default(),
            stop_loss_distance: 0.0009,
            take_profit_distance: 0.0040,
            scale_exits_to_range: false,
            slippage: 0.0002,
            risk_percent: 3.0,
            allow_concurrent_positions: false,
        }
    }
}

/// Evaluates breakout entries; pure function of the series and account inputs
#[derive(Debug, Clone)]
pub struct BreakoutEngine {
    config: BreakoutConfig,
    detector: RangeDetector,
}

impl BreakoutEngine {
    pub fn new(config: BreakoutConfig) -> Self {
        let detector = RangeDetector::new(config.range.clone());
        BreakoutEngine { config, detector }
    }

    pub fn config(&self) -> &BreakoutConfig {
        &self.config
    }

    /// Evaluate one period. `trigger_price` is the newest entry's last price
    /// in replays, or a live quote. Returns `Ok(None)` when there is no
    /// setup; `InsufficientHistory` propagates so the caller can skip the
    /// period during warm-up.
    pub fn evaluate<E: SeriesEntry>(
        &self,
        series: &PriceSeries<E>,
        trigger_price: f64,
        equity: f64,
        spec: &InstrumentSpec,
        open_positions: usize,
    ) -> Result<Option<TradeIntent>, SeriesError> {
        if open_positions > 0 && !self.config.allow_concurrent_positions {
            return Ok(None);
        }

        let range = self.detector.evaluate(series)?;
        if !range.is_tight {
            return Ok(None);
        }

        // Armed: look for a close beyond the hover envelope
        let direction = if trigger_price > range.high {
            Direction::Long
        } else if trigger_price < range.low {
            Direction::Short
        } else {
            return Ok(None);
        };

        let (stop_distance, target_distance) = if self.config.scale_exits_to_range {
            (
                self.config.stop_loss_distance * range.mean_bar_span,
                self.config.take_profit_distance * range.mean_bar_span,
            )
        } else {
            (self.config.stop_loss_distance, self.config.take_profit_distance)
        };

        let sign = direction.sign();
        let entry_price = spec.round_price(trigger_price + sign * self.config.slippage);
        let stop_loss = spec.round_price(entry_price - sign * stop_distance);
        let take_profit = spec.round_price(entry_price + sign * target_distance);

        // Size against the rounded stop so risk matches the order actually placed
        let placed_stop_distance = (entry_price - stop_loss).abs();
        let volume =
            match size_volume(equity, self.config.risk_percent, placed_stop_distance, spec) {
                Ok(volume) => volume,
                Err(e) => {
                    warn!("Sizing failed, skipping trade: {}", e);
                    return Ok(None);
                }
            };
        if volume <= 0.0 {
            debug!(
                "Sized volume below minimum (equity={:.2}, stop={:.5}), skipping trade",
                equity, placed_stop_distance
            );
            return Ok(None);
        }

        Ok(Some(TradeIntent {
            direction,
            entry_price,
            stop_loss,
            take_profit,
            volume,
            risk_money: equity * self.config.risk_percent / 100.0,
        }))
    }
}
