use std::fmt::Write;

use clap::ValueEnum;
use serde::Serialize;

use crate::models::{RollingStats, SleepRecord, WakeCheckResult, WakeThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

pub fn render<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => Ok(text(value)),
    }
}

fn write_thresholds(output: &mut String, stats: &RollingStats, thresholds: &WakeThresholds) {
    let _ = writeln!(output, "## Thresholds");
    let _ = writeln!(
        output,
        "- End hour: >= {:.0}:00 UTC (earliest recent wake {:.0}:00 UTC)",
        thresholds.end_hour_min, stats.min_end_hour
    );
    let _ = writeln!(output, "- Duration: >= {:.1}h", thresholds.duration_min);
    let _ = writeln!(output, "- Cycles: >= {:.0}", thresholds.cycles_min);
    let _ = writeln!(
        output,
        "- Performance: >= {:.0}%",
        thresholds.performance_min
    );
}

pub fn render_wake_check(result: &WakeCheckResult) -> String {
    let mut output = String::new();
    let status = if result.is_awake {
        "AWAKE"
    } else {
        "STILL ASLEEP"
    };

    let _ = writeln!(output, "Status: {status}");
    let _ = writeln!(output, "Score: {}/{}", result.score, result.max_score);
    let _ = writeln!(
        output,
        "Confidence: {} ({}-day baseline)",
        result.confidence.label(),
        result.stats.sample_size
    );

    let sleep = &result.sleep;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sleep {}", sleep.date);
    let _ = writeln!(output, "- Ended: {:02}:00 UTC", sleep.end_utc_hour);
    let _ = writeln!(output, "- In bed: {:.1}h", sleep.duration_hours);
    let _ = writeln!(output, "- Cycles: {}", sleep.cycles);
    let _ = writeln!(output, "- Performance: {:.0}%", sleep.performance);
    let _ = writeln!(output, "- Efficiency: {:.0}%", sleep.efficiency);

    let _ = writeln!(output);
    write_thresholds(&mut output, &result.stats, &result.thresholds);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Checks");
    for check in result.checks.iter() {
        let marker = if check.passed { "PASS" } else { "FAIL" };
        let _ = writeln!(
            output,
            "- [{marker}] {} (+{}): {}",
            check.name, check.points, check.detail
        );
    }

    output
}

pub fn render_history(records: &[SleepRecord]) -> String {
    let mut output = String::new();

    if records.is_empty() {
        let _ = writeln!(output, "No sleep history recorded yet.");
        return output;
    }

    let _ = writeln!(output, "Sleep history ({} days):", records.len());
    for record in records.iter() {
        let _ = writeln!(
            output,
            "- {}: ended {:02}:00 UTC, {:.1}h in bed, {} cycles, {:.0}% performance, {:.0}% efficiency",
            record.date,
            record.end_utc_hour,
            record.duration_hours,
            record.cycles,
            record.performance,
            record.efficiency
        );
    }

    output
}

/// Baseline a wake check would use, alongside the thresholds derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct Baseline {
    pub stats: RollingStats,
    pub thresholds: WakeThresholds,
}

pub fn render_baseline(baseline: &Baseline) -> String {
    let mut output = String::new();
    let stats = &baseline.stats;

    if stats.sample_size == 0 {
        let _ = writeln!(output, "Rolling baseline: defaults (no history)");
    } else {
        let _ = writeln!(
            output,
            "Rolling baseline: last {} days",
            stats.sample_size
        );
    }
    let _ = writeln!(
        output,
        "- End hour: avg {:.1} UTC, earliest {:.0} UTC",
        stats.avg_end_hour, stats.min_end_hour
    );
    let _ = writeln!(
        output,
        "- Duration: avg {:.1}h, min {:.1}h",
        stats.avg_duration, stats.min_duration
    );
    let _ = writeln!(
        output,
        "- Cycles: avg {:.1}, min {:.0}",
        stats.avg_cycles, stats.min_cycles
    );
    let _ = writeln!(
        output,
        "- Performance: avg {:.0}%, min {:.0}%",
        stats.avg_performance, stats.min_performance
    );
    let _ = writeln!(output);
    write_thresholds(&mut output, stats, &baseline.thresholds);

    output
}
