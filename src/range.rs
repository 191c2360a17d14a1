//! Hover range detection over a lookback window
//!
//! A "hover" is a tight consolidation band: the high/low envelope of the
//! lookback window stays within a threshold, either a fixed price distance
//! or a multiple of the window's average bar span (ATR).

use serde::{Deserialize, Serialize};

use crate::series::{PriceSeries, SeriesEntry, SeriesError};

/// How the tightness threshold is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Constant price distance from config
    Fixed,
    /// `atr_multiplier * mean(high - low)` over the window
    Atr,
}

/// Range detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeDetectorConfig {
    /// Number of completed entries in the window
    pub lookback_period: usize,
    pub range_threshold_mode: ThresholdMode,
    /// Threshold in price units (fixed mode)
    pub range_threshold_value: f64,
    /// Threshold as a multiple of average bar span (atr mode)
    pub atr_multiplier: f64,
    /// With `true` the window ends at the entry right before the trigger;
    /// with `false` that signal entry is excluded and the window backs off
    /// one further entry
    pub include_signal_bar: bool,
}

impl Default for RangeDetectorConfig {
    fn default() -> Self {
        RangeDetectorConfig {
            lookback_period: 6,
            range_threshold_mode: ThresholdMode::Fixed,
            range_threshold_value: 0.004,
            atr_multiplier: 1.0,
            include_signal_bar: true,
        }
    }
}

/// Snapshot of the detected range for one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeWindow {
    pub high: f64,
    pub low: f64,
    /// `high - low`
    pub span: f64,
    /// Mean per-entry `high - low`, used for range-scaled exit distances
    pub mean_bar_span: f64,
    /// Threshold the span was compared against
    pub threshold: f64,
    /// `span <= threshold` (inclusive)
    pub is_tight: bool,
}

/// Computes hover ranges; stateless between evaluations
#[derive(Debug, Clone)]
pub struct RangeDetector {
    config: RangeDetectorConfig,
}

impl RangeDetector {
    pub fn new(config: RangeDetectorConfig) -> Self {
        RangeDetector { config }
    }

    /// Evaluate the range over the configured lookback window. The newest
    /// appended entry is the trigger entry and is never part of the window.
    pub fn evaluate<E: SeriesEntry>(
        &self,
        series: &PriceSeries<E>,
    ) -> Result<RangeWindow, SeriesError> {
        let skip = if self.config.include_signal_bar { 0 } else { 1 };
        let window = series.window_offset(self.config.lookback_period, skip)?;

        let Some(first) = window.first() else {
            return Err(SeriesError::InsufficientHistory {
                needed: 1,
                available: 0,
            });
        };

        let mut high = first.high();
        let mut low = first.low();
        let mut span_sum = 0.0;
        for entry in window {
            high = high.max(entry.high());
            low = low.min(entry.low());
            span_sum += entry.high() - entry.low();
        }

        let span = high - low;
        let mean_bar_span = span_sum / window.len() as f64;
        let threshold = match self.config.range_threshold_mode {
            ThresholdMode::Fixed => self.config.range_threshold_value,
            ThresholdMode::Atr => mean_bar_span * self.config.atr_multiplier,
        };

        Ok(RangeWindow {
            high,
            low,
            span,
            mean_bar_span,
            threshold,
            is_tight: span <= threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PeriodClock;
    use crate::types::Bar;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn series_from_ranges(ranges: &[(f64, f64)]) -> PriceSeries<Bar> {
        let mut series = PriceSeries::new(PeriodClock::EveryBar);
        for (i, (low, high)) in ranges.iter().enumerate() {
            let mid = (low + high) / 2.0;
            let bar = Bar::new(t(i as i64), mid, *high, *low, mid).unwrap();
            series.append(bar).unwrap();
        }
        series
    }

    fn config(lookback: usize, threshold: f64) -> RangeDetectorConfig {
        RangeDetectorConfig {
            lookback_period: lookback,
            range_threshold_mode: ThresholdMode::Fixed,
            range_threshold_value: threshold,
            atr_multiplier: 1.0,
            include_signal_bar: true,
        }
    }

    #[test]
    fn test_fixed_threshold_tight_and_wide() {
        // Three window bars spanning 1.1000..1.1004, plus a trigger bar
        let series = series_from_ranges(&[
            (1.1000, 1.1003),
            (1.1001, 1.1004),
            (1.1000, 1.1002),
            (1.1002, 1.1003),
        ]);

        let detector = RangeDetector::new(config(3, 0.0005));
        let range = detector.evaluate(&series).unwrap();
        assert!((range.high - 1.1004).abs() < 1e-9);
        assert!((range.low - 1.1000).abs() < 1e-9);
        assert!(range.is_tight);

        let detector = RangeDetector::new(config(3, 0.0003));
        let range = detector.evaluate(&series).unwrap();
        assert!(!range.is_tight);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let series = series_from_ranges(&[(1.1000, 1.1004), (1.1000, 1.1004), (1.1, 1.2)]);
        let detector = RangeDetector::new(config(2, 0.0004));
        let range = detector.evaluate(&series).unwrap();
        assert!((range.span - 0.0004).abs() < 1e-9);
        assert!(range.is_tight);
    }

    #[test]
    fn test_atr_threshold() {
        // Window bar spans 0.0002 and 0.0004, mean 0.0003; envelope span 0.0005
        let series = series_from_ranges(&[
            (1.1000, 1.1002),
            (1.1001, 1.1005),
            (1.1002, 1.1003),
        ]);

        let mut cfg = config(2, 0.0);
        cfg.range_threshold_mode = ThresholdMode::Atr;
        cfg.atr_multiplier = 2.0;
        let range = RangeDetector::new(cfg.clone()).evaluate(&series).unwrap();
        assert!((range.mean_bar_span - 0.0003).abs() < 1e-9);
        assert!((range.threshold - 0.0006).abs() < 1e-9);
        assert!(range.is_tight);

        cfg.atr_multiplier = 1.0;
        let range = RangeDetector::new(cfg).evaluate(&series).unwrap();
        assert!(!range.is_tight);
    }

    #[test]
    fn test_signal_bar_exclusion_shifts_window() {
        // Tight band, then one wide signal bar, then the trigger bar
        let series = series_from_ranges(&[
            (1.1000, 1.1003),
            (1.1001, 1.1004),
            (1.1000, 1.1003),
            (1.0950, 1.1050),
            (1.1002, 1.1003),
        ]);

        let mut cfg = config(3, 0.0005);
        cfg.include_signal_bar = true;
        let range = RangeDetector::new(cfg.clone()).evaluate(&series).unwrap();
        // Window covers the wide bar
        assert!(!range.is_tight);

        cfg.include_signal_bar = false;
        let range = RangeDetector::new(cfg).evaluate(&series).unwrap();
        assert!(range.is_tight);
        assert!((range.high - 1.1004).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_history() {
        let series = series_from_ranges(&[(1.1000, 1.1003), (1.1001, 1.1004)]);
        let detector = RangeDetector::new(config(3, 0.001));
        let err = detector.evaluate(&series).unwrap_err();
        assert_eq!(
            err,
            SeriesError::InsufficientHistory {
                needed: 3,
                available: 1
            }
        );
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let series = series_from_ranges(&[
            (1.1000, 1.1003),
            (1.1001, 1.1004),
            (1.1000, 1.1002),
            (1.1002, 1.1003),
        ]);
        let detector = RangeDetector::new(config(3, 0.0005));

        let a = detector.evaluate(&series).unwrap();
        let b = detector.evaluate(&series).unwrap();
        assert_eq!(a, b);
    }
}
