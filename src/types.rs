//! Core data types used across the simulator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for bar data
#[derive(Debug, Error)]
pub enum BarValidationError {
    #[error("prices must be finite: open={open}, high={high}, low={low}, close={close}")]
    NonFinitePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },
}

/// OHLC bar for one sampling period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// Create a new bar with validation
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self {
            time,
            open,
            high,
            low,
            close,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (for trusted sources or when validation is done separately)
    pub fn new_unchecked(time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Validate the bar data
    pub fn validate(&self) -> Result<(), BarValidationError> {
        // Check for non-finite prices
        if !self.open.is_finite()
            || !self.high.is_finite()
            || !self.low.is_finite()
            || !self.close.is_finite()
        {
            return Err(BarValidationError::NonFinitePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        // Check for non-positive prices
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        // Check high >= low
        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        // Check open is within [low, high] range
        if self.open < self.low || self.open > self.high {
            return Err(BarValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        // Check close is within [low, high] range
        if self.close < self.low || self.close > self.high {
            return Err(BarValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Check if the bar is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Single price observation, used by interval-sampled runs in place of bars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub time: DateTime<Utc>,
    pub price: f64,
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeExit,
    DrawdownFlatten,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
            ExitReason::TimeExit => write!(f, "time_exit"),
            ExitReason::DrawdownFlatten => write!(f, "drawdown_flatten"),
        }
    }
}

/// Static tick economics and volume constraints of the traded instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentSpec {
    pub symbol: String,
    /// Minimum price increment
    pub tick_size: f64,
    /// Money moved by one tick for one unit of volume
    pub tick_value: f64,
    /// Units of the underlying per 1.0 volume
    pub contract_multiplier: f64,
    pub min_volume: f64,
    pub max_volume: f64,
    pub volume_step: f64,
    /// Price value of one point, for point-denominated distances
    pub point_size: f64,
    /// Decimal places order prices are rounded to
    pub digits: u32,
}

impl InstrumentSpec {
    /// Standard FX major economics (one lot = 100k units, pip = 0.0001)
    pub fn fx_standard(symbol: impl Into<String>) -> Self {
        InstrumentSpec {
            symbol: symbol.into(),
            tick_size: 0.0001,
            tick_value: 10.0,
            contract_multiplier: 100_000.0,
            min_volume: 0.01,
            max_volume: 100.0,
            volume_step: 0.01,
            point_size: 0.0001,
            digits: 5,
        }
    }

    /// Round a price to the instrument's decimal precision
    pub fn round_price(&self, price: f64) -> f64 {
        let scale = 10f64.powi(self.digits as i32);
        (price * scale).round() / scale
    }

    /// Convert a point-denominated distance into a price distance
    pub fn points_to_price(&self, points: f64) -> f64 {
        points * self.point_size
    }
}

impl Default for InstrumentSpec {
    fn default() -> Self {
        InstrumentSpec::fx_standard("EURUSD")
    }
}

/// Sized order proposal emitted by the engine, consumed once by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub volume: f64,
    /// Money put at risk if the stop fills, kept for expectancy reporting
    pub risk_money: f64,
}

/// Open position; stop and target are fixed at open and never amended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub volume: f64,
    pub risk_money: f64,
    pub open_time: DateTime<Utc>,
    pub open_index: usize,
}

impl Position {
    /// Realized profit if the position were closed at `exit_price`
    pub fn profit_at(&self, exit_price: f64, contract_multiplier: f64) -> f64 {
        (exit_price - self.entry_price) * self.direction.sign() * self.volume * contract_multiplier
    }
}

/// Completed trade record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: u64,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub volume: f64,
    pub risk_money: f64,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub profit: f64,
    pub exit_reason: ExitReason,
}

/// Account equity and its running peak
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: f64,
    pub peak_equity: f64,
}

impl AccountState {
    pub fn new(starting_equity: f64) -> Self {
        AccountState {
            equity: starting_equity,
            peak_equity: starting_equity,
        }
    }
}

/// One point on the realized equity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub equity: f64,
}
