use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of sleep as kept in the rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepRecord {
    pub date: NaiveDate,
    pub end_utc_hour: u32,
    pub duration_hours: f64,
    pub cycles: u32,
    pub performance: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingStats {
    pub avg_end_hour: f64,
    pub min_end_hour: f64,
    pub avg_duration: f64,
    pub min_duration: f64,
    pub avg_cycles: f64,
    pub min_cycles: f64,
    pub avg_performance: f64,
    pub min_performance: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeThresholds {
    pub end_hour_min: f64,
    pub duration_min: f64,
    pub cycles_min: f64,
    pub performance_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeCheck {
    pub name: &'static str,
    pub passed: bool,
    pub points: u32,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn label(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeCheckResult {
    pub is_awake: bool,
    pub score: u32,
    pub max_score: u32,
    pub confidence: Confidence,
    pub sleep: SleepRecord,
    pub thresholds: WakeThresholds,
    pub checks: Vec<WakeCheck>,
    pub stats: RollingStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSession {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedSummary {
    pub seeded: Vec<NaiveDate>,
    pub skipped: Vec<SkippedSession>,
}
