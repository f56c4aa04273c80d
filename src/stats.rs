use chrono::NaiveDate;

use crate::models::{RollingStats, SleepRecord};
use crate::session::round_to;

/// Number of most recent history days feeding the baseline.
pub const ROLLING_WINDOW: usize = 7;

/// Baseline used before any history exists, roughly a 6 AM Pacific wake.
pub fn default_stats() -> RollingStats {
    RollingStats {
        avg_end_hour: 14.0,
        min_end_hour: 13.0,
        avg_duration: 7.0,
        min_duration: 5.0,
        avg_cycles: 4.0,
        min_cycles: 3.0,
        avg_performance: 80.0,
        min_performance: 70.0,
        sample_size: 0,
    }
}

/// Summarises the last [`ROLLING_WINDOW`] days of `history`, skipping `exclude_date`.
///
/// `history` is expected in ascending date order, as the store keeps it.
pub fn calculate_rolling_stats(
    history: &[SleepRecord],
    exclude_date: Option<NaiveDate>,
) -> RollingStats {
    let filtered: Vec<&SleepRecord> = history
        .iter()
        .filter(|record| Some(record.date) != exclude_date)
        .collect();
    let window = &filtered[filtered.len().saturating_sub(ROLLING_WINDOW)..];

    if window.is_empty() {
        return default_stats();
    }

    let end_hours: Vec<f64> = window.iter().map(|r| f64::from(r.end_utc_hour)).collect();
    let durations: Vec<f64> = window.iter().map(|r| r.duration_hours).collect();
    let cycles: Vec<f64> = window.iter().map(|r| f64::from(r.cycles)).collect();
    let performance: Vec<f64> = window.iter().map(|r| r.performance).collect();

    RollingStats {
        avg_end_hour: mean(&end_hours),
        min_end_hour: min(&end_hours),
        avg_duration: round_to(mean(&durations), 1),
        min_duration: round_to(min(&durations), 1),
        avg_cycles: round_to(mean(&cycles), 1),
        min_cycles: min(&cycles),
        avg_performance: mean(&performance).round(),
        min_performance: min(&performance).round(),
        sample_size: window.len(),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}
