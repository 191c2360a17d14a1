//! Data loading
//!
//! Loads OHLC bars from CSV files with per-row validation, filters them by
//! date range, and generates a seeded synthetic random walk when no data
//! file is available.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::{info, warn};

use crate::types::Bar;

/// Load bars from a CSV file with columns time, open, high, low, close.
/// Rows that fail bar validation are skipped with a warning.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut bars = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing time column")?;
        let time = parse_date(dt_str).context(format!("Failed to parse time: {}", dt_str))?;

        let open: f64 = record
            .get(1)
            .context("Missing open column")?
            .parse()
            .context("Failed to parse open")?;
        let high: f64 = record
            .get(2)
            .context("Missing high column")?
            .parse()
            .context("Failed to parse high")?;
        let low: f64 = record
            .get(3)
            .context("Missing low column")?
            .parse()
            .context("Failed to parse low")?;
        let close: f64 = record
            .get(4)
            .context("Missing close column")?
            .parse()
            .context("Failed to parse close")?;

        match Bar::new(time, open, high, low, close) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid bar at row {} in {:?}: {}",
                    row_idx + 2, // 1-indexed plus header row
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid bars out of {} in {:?}",
            invalid_count,
            invalid_count + bars.len(),
            path.file_name().unwrap_or_default()
        );
    }

    info!("Loaded {} bars from {}", bars.len(), path.display());
    Ok(bars)
}

/// Filter bars by an inclusive date range
pub fn filter_bars_by_date(
    bars: Vec<Bar>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| {
            let after_start = start.is_none_or(|s| b.time >= s);
            let before_end = end.is_none_or(|e| b.time <= e);
            after_start && before_end
        })
        .collect()
}

/// Parse a date string (RFC 3339, YYYY-MM-DD HH:MM:SS, or YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = date_str.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }

    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }

    if let Ok(nd) = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        let ndt = nd.and_hms_opt(0, 0, 0).unwrap();
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }

    anyhow::bail!(
        "Failed to parse date: {}. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS format",
        date_str
    )
}

/// Seeded synthetic random walk of 30-minute bars, for demonstration runs
/// without a data file. Same seed, same bars.
pub fn synthetic_walk(periods: usize, start_price: f64, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let mut price = start_price;

    (0..periods)
        .map(|i| {
            price += (rng.gen::<f64>() - 0.5) * 0.0002;
            let open = price;
            let close = price + (rng.gen::<f64>() - 0.5) * 0.0001;
            let high = open.max(close) + rng.gen::<f64>() * 0.0002;
            let low = open.min(close) - rng.gen::<f64>() * 0.0002;
            Bar::new_unchecked(start + Duration::minutes(30 * i as i64), open, high, low, close)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-01-15").is_ok());
        assert!(parse_date("2024-01-15 13:30:00").is_ok());
        assert!(parse_date("2024-01-15T13:30:00Z").is_ok());
        assert!(parse_date("15/01/2024").is_err());
    }

    #[test]
    fn test_filter_bars_by_date() {
        let bars = synthetic_walk(100, 1.10, 1);
        let start = bars[10].time;
        let end = bars[20].time;

        let filtered = filter_bars_by_date(bars.clone(), Some(start), Some(end));
        assert_eq!(filtered.len(), 11);
        assert_eq!(filtered.first().map(|b| b.time), Some(start));
        assert_eq!(filtered.last().map(|b| b.time), Some(end));

        let unfiltered = filter_bars_by_date(bars, None, None);
        assert_eq!(unfiltered.len(), 100);
    }

    #[test]
    fn test_synthetic_walk_is_seeded_and_valid() {
        let a = synthetic_walk(500, 1.10, 42);
        let b = synthetic_walk(500, 1.10, 42);
        let c = synthetic_walk(500, 1.10, 43);

        assert_eq!(a, b);
        assert_ne!(a, c);

        for bar in &a {
            assert!(bar.is_valid(), "invalid synthetic bar: {:?}", bar);
        }
        for pair in a.windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn test_load_csv_skips_invalid_rows() {
        let path = std::env::temp_dir().join(format!("hover_breakout_data_{}.csv", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "time,open,high,low,close").unwrap();
            writeln!(file, "2024-01-01 00:00:00,1.1002,1.1010,1.1000,1.1008").unwrap();
            // high below low: skipped
            writeln!(file, "2024-01-01 00:30:00,1.1002,1.0990,1.1000,1.1002").unwrap();
            writeln!(file, "2024-01-01 01:00:00,1.1008,1.1012,1.1005,1.1010").unwrap();
        }

        let bars = load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bars.len(), 2);
        assert!((bars[1].close - 1.1010).abs() < 1e-9);
    }
}
