use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Timelike, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::SleepRecord;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The session cannot be reduced to a sleep record.
    #[error("invalid input: sleep session is missing or has an unusable `{0}`")]
    InvalidInput(&'static str),
}

/// Sleep activity as returned by the provider's `activity/sleep` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepSession {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub timezone_offset: Option<String>,
    #[serde(default)]
    pub nap: Option<bool>,
    #[serde(default)]
    pub score_state: Option<String>,
    #[serde(default)]
    pub score: Option<SleepScore>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SleepScore {
    #[serde(default)]
    pub stage_summary: Option<StageSummary>,
    #[serde(default)]
    pub sleep_performance_percentage: Option<f64>,
    #[serde(default)]
    pub sleep_efficiency_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StageSummary {
    #[serde(default)]
    pub total_in_bed_time_milli: Option<i64>,
    #[serde(default)]
    pub sleep_cycle_count: Option<u32>,
}

impl SleepSession {
    /// Identifier used when reporting on this session.
    pub fn label(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
            None => self.start.clone().unwrap_or_else(|| "<unknown>".to_string()),
        }
    }

    fn is_nap(&self) -> bool {
        self.nap.unwrap_or(false)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SessionPayload {
    Page { records: Vec<SleepSession> },
    Many(Vec<SleepSession>),
    One(SleepSession),
}

pub fn parse_sessions(raw: &str) -> anyhow::Result<Vec<SleepSession>> {
    let payload: SessionPayload =
        serde_json::from_str(raw).context("sleep input is not a recognised JSON payload")?;

    Ok(match payload {
        SessionPayload::Page { records } => records,
        SessionPayload::Many(sessions) => sessions,
        SessionPayload::One(session) => vec![session],
    })
}

/// Reads sessions from `path`, or from stdin when `path` is `-`.
pub fn read_sessions(path: &Path) -> anyhow::Result<Vec<SleepSession>> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read sleep sessions from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sleep sessions from {}", path.display()))?
    };

    parse_sessions(&raw)
}

/// Picks the session to evaluate: the most recent non-nap sleep, falling back
/// to the most recent session of any kind.
pub fn select_candidate(sessions: &[SleepSession]) -> Result<&SleepSession, SessionError> {
    let latest = |nap_ok: bool| {
        sessions
            .iter()
            .filter(|session| nap_ok || !session.is_nap())
            .filter_map(|session| {
                let start = session.start.as_deref()?;
                let start = DateTime::parse_from_rfc3339(start).ok()?;
                Some((start, session))
            })
            .max_by_key(|(start, _)| *start)
            .map(|(_, session)| session)
    };

    latest(false)
        .or_else(|| latest(true))
        .or_else(|| sessions.last())
        .ok_or(SessionError::InvalidInput("sleep"))
}

pub fn parse_sleep_record(session: &SleepSession) -> Result<SleepRecord, SessionError> {
    let start = session
        .start
        .as_deref()
        .ok_or(SessionError::InvalidInput("start"))?;
    let start =
        DateTime::parse_from_rfc3339(start).map_err(|_| SessionError::InvalidInput("start"))?;

    let end = session.end.as_deref().ok_or(SessionError::InvalidInput("end"))?;
    let end = DateTime::parse_from_rfc3339(end)
        .map_err(|_| SessionError::InvalidInput("end"))?
        .with_timezone(&Utc);

    if let Some(state) = session.score_state.as_deref() {
        if state != "SCORED" {
            return Err(SessionError::InvalidInput("score"));
        }
    }

    let score = session
        .score
        .as_ref()
        .ok_or(SessionError::InvalidInput("score"))?;
    let summary = score
        .stage_summary
        .as_ref()
        .ok_or(SessionError::InvalidInput("stage_summary"))?;

    let in_bed_milli = summary
        .total_in_bed_time_milli
        .filter(|millis| *millis >= 0)
        .ok_or(SessionError::InvalidInput("total_in_bed_time_milli"))?;
    let cycles = summary
        .sleep_cycle_count
        .ok_or(SessionError::InvalidInput("sleep_cycle_count"))?;
    let performance = score
        .sleep_performance_percentage
        .ok_or(SessionError::InvalidInput("sleep_performance_percentage"))?;
    let efficiency = score
        .sleep_efficiency_percentage
        .ok_or(SessionError::InvalidInput("sleep_efficiency_percentage"))?;

    Ok(SleepRecord {
        date: local_date(start, session.timezone_offset.as_deref())?,
        end_utc_hour: end.hour(),
        duration_hours: round_to(in_bed_milli as f64 / MILLIS_PER_HOUR, 2),
        cycles,
        performance,
        efficiency,
    })
}

fn local_date(
    start: DateTime<FixedOffset>,
    timezone_offset: Option<&str>,
) -> Result<NaiveDate, SessionError> {
    match timezone_offset {
        Some(offset) => {
            let offset: FixedOffset = offset
                .parse()
                .map_err(|_| SessionError::InvalidInput("timezone_offset"))?;
            Ok(start.with_timezone(&offset).date_naive())
        }
        None => Ok(start.with_timezone(&Local).date_naive()),
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
