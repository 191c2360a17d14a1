//! Risk-based position sizing from equity and instrument tick economics
//!
//! Volume is derived from the money at risk (a percentage of equity) and
//! the money lost per unit of volume over the stop distance, then snapped
//! to the instrument's volume step and limits. A volume of zero is a
//! "do not trade" signal, not an error.

use thiserror::Error;

use crate::types::InstrumentSpec;

/// Errors raised by the sizer
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SizingError {
    #[error("invalid instrument: tick_size ({tick_size}) must be positive")]
    InvalidInstrument { tick_size: f64 },
}

/// Compute the tradable volume for a stop distance in price units.
///
/// Returns 0.0 when the risk budget cannot buy the minimum volume, or when
/// the stop distance yields no loss per unit (nothing sensible to size).
pub fn size_volume(
    equity: f64,
    risk_percent: f64,
    stop_distance: f64,
    spec: &InstrumentSpec,
) -> Result<f64, SizingError> {
    if spec.tick_size <= 0.0 {
        return Err(SizingError::InvalidInstrument {
            tick_size: spec.tick_size,
        });
    }

    let risk_money = equity * risk_percent / 100.0;
    let money_per_price_unit = spec.tick_value / spec.tick_size;
    let loss_per_unit_volume = stop_distance * money_per_price_unit;
    if loss_per_unit_volume <= 0.0 {
        return Ok(0.0);
    }

    let raw = risk_money / loss_per_unit_volume;
    let stepped = (raw / spec.volume_step).floor() * spec.volume_step;
    if stepped < spec.min_volume {
        return Ok(0.0);
    }

    Ok(stepped.min(spec.max_volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fx() -> InstrumentSpec {
        InstrumentSpec::fx_standard("EURUSD")
    }

    #[test]
    fn test_standard_fx_sizing() {
        // 1% of 10k = 100 at risk; a 15 pip stop loses 150 per lot
        let volume = size_volume(10_000.0, 1.0, 0.0015, &fx()).unwrap();
        assert_relative_eq!(volume, 0.66, epsilon = 1e-9);
    }

    #[test]
    fn test_volume_is_multiple_of_step() {
        let spec = fx();
        for equity in [1_000.0, 5_000.0, 10_000.0, 50_000.0, 123_456.0] {
            let volume = size_volume(equity, 2.0, 0.0010, &spec).unwrap();
            let steps = volume / spec.volume_step;
            assert_relative_eq!(steps, steps.round(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_below_minimum_returns_zero() {
        // 1% of 100 = 1 at risk; 15 pip stop loses 150 per lot -> under 0.01 lots
        let volume = size_volume(100.0, 1.0, 0.0015, &fx()).unwrap();
        assert_eq!(volume, 0.0);
    }

    #[test]
    fn test_clamped_to_max_volume() {
        let volume = size_volume(100_000_000.0, 5.0, 0.0010, &fx()).unwrap();
        assert_relative_eq!(volume, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_stop_distance_returns_zero() {
        let volume = size_volume(10_000.0, 1.0, 0.0, &fx()).unwrap();
        assert_eq!(volume, 0.0);

        let volume = size_volume(10_000.0, 1.0, -0.001, &fx()).unwrap();
        assert_eq!(volume, 0.0);
    }

    #[test]
    fn test_zero_risk_returns_zero() {
        let volume = size_volume(10_000.0, 0.0, 0.0015, &fx()).unwrap();
        assert_eq!(volume, 0.0);
    }

    #[test]
    fn test_invalid_tick_size() {
        let mut spec = fx();
        spec.tick_size = 0.0;
        let err = size_volume(10_000.0, 1.0, 0.0015, &spec).unwrap_err();
        assert!(matches!(err, SizingError::InvalidInstrument { .. }));
    }

    #[test]
    fn test_monotonic_in_equity() {
        let spec = fx();
        let mut previous = 0.0;
        for equity in (1..=100).map(|i| i as f64 * 1_000.0) {
            let volume = size_volume(equity, 1.0, 0.0015, &spec).unwrap();
            assert!(volume >= previous);
            previous = volume;
        }
    }
}
