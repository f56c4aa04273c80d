use crate::models::{
    Confidence, RollingStats, SeedSummary, SkippedSession, SleepRecord, WakeCheck,
    WakeCheckResult, WakeThresholds,
};
use crate::session::{self, round_to, SleepSession};
use crate::stats::calculate_rolling_stats;
use crate::store::HistoryStore;

// Scoring policy. The weights, threshold and factors are empirically tuned;
// change them together.
pub const MAX_SCORE: u32 = 10;
pub const AWAKE_THRESHOLD: u32 = 6;

pub const END_HOUR_MINIMUM_POINTS: u32 = 3;
pub const END_HOUR_TYPICAL_POINTS: u32 = 2;
pub const DURATION_POINTS: u32 = 2;
pub const CYCLES_POINTS: u32 = 2;
pub const PERFORMANCE_POINTS: u32 = 1;

/// Hours of slack below the earliest recent wake hour.
pub const END_HOUR_SLACK: f64 = 2.0;
pub const DURATION_FACTOR: f64 = 0.7;
pub const PERFORMANCE_FACTOR: f64 = 0.75;
pub const CYCLES_FLOOR: f64 = 2.0;

pub fn derive_thresholds(stats: &RollingStats) -> WakeThresholds {
    WakeThresholds {
        end_hour_min: stats.min_end_hour - END_HOUR_SLACK,
        duration_min: round_to(stats.avg_duration * DURATION_FACTOR, 1),
        cycles_min: (stats.min_cycles - 1.0).max(CYCLES_FLOOR),
        performance_min: (stats.avg_performance * PERFORMANCE_FACTOR).round(),
    }
}

pub fn confidence_for(sample_size: usize) -> Confidence {
    if sample_size >= 7 {
        Confidence::High
    } else if sample_size >= 3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn check(name: &'static str, passed: bool, weight: u32, detail: String) -> WakeCheck {
    WakeCheck {
        name,
        passed,
        points: if passed { weight } else { 0 },
        detail,
    }
}

fn comparison(passed: bool) -> &'static str {
    if passed {
        ">="
    } else {
        "<"
    }
}

/// Scores `sleep` against a baseline built from `history`, excluding the
/// sleep's own date. Has no side effects.
pub fn score_sleep(sleep: &SleepRecord, history: &[SleepRecord]) -> WakeCheckResult {
    let stats = calculate_rolling_stats(history, Some(sleep.date));
    let thresholds = derive_thresholds(&stats);
    let end_hour = f64::from(sleep.end_utc_hour);
    let cycles = f64::from(sleep.cycles);

    let passed = end_hour >= thresholds.end_hour_min;
    let end_hour_minimum = check(
        "end_hour_minimum",
        passed,
        END_HOUR_MINIMUM_POINTS,
        format!(
            "ended at {:02}:00 UTC {} minimum {:.0}:00 UTC",
            sleep.end_utc_hour,
            comparison(passed),
            thresholds.end_hour_min
        ),
    );

    let passed = end_hour >= stats.min_end_hour;
    let end_hour_typical = check(
        "end_hour_typical",
        passed,
        END_HOUR_TYPICAL_POINTS,
        format!(
            "ended at {:02}:00 UTC {} earliest recent wake {:.0}:00 UTC",
            sleep.end_utc_hour,
            comparison(passed),
            stats.min_end_hour
        ),
    );

    let passed = sleep.duration_hours >= thresholds.duration_min;
    let duration = check(
        "duration",
        passed,
        DURATION_POINTS,
        format!(
            "{:.1}h in bed {} {:.1}h (70% of {:.1}h average)",
            sleep.duration_hours,
            comparison(passed),
            thresholds.duration_min,
            stats.avg_duration
        ),
    );

    let passed = cycles >= thresholds.cycles_min;
    let cycles_check = check(
        "cycles",
        passed,
        CYCLES_POINTS,
        format!(
            "{} sleep cycles {} {:.0}",
            sleep.cycles,
            comparison(passed),
            thresholds.cycles_min
        ),
    );

    let passed = sleep.performance >= thresholds.performance_min;
    let performance = check(
        "performance",
        passed,
        PERFORMANCE_POINTS,
        format!(
            "{:.0}% performance {} {:.0}% (75% of {:.0}% average)",
            sleep.performance,
            comparison(passed),
            thresholds.performance_min,
            stats.avg_performance
        ),
    );

    let checks = vec![
        end_hour_minimum,
        end_hour_typical,
        duration,
        cycles_check,
        performance,
    ];
    let score: u32 = checks.iter().map(|c| c.points).sum();

    WakeCheckResult {
        is_awake: score >= AWAKE_THRESHOLD,
        score,
        max_score: MAX_SCORE,
        confidence: confidence_for(stats.sample_size),
        sleep: sleep.clone(),
        thresholds,
        checks,
        stats,
    }
}

/// Runs wake checks against a persisted sleep history.
pub struct WakeDetector<S> {
    store: S,
}

impl<S: HistoryStore> WakeDetector<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scores `session` and, when it reads as awake, folds it into the history.
    ///
    /// `history_override` replaces the stored history as the baseline; the
    /// store still receives the record on an awake result.
    pub fn evaluate(
        &self,
        session: &SleepSession,
        history_override: Option<&[SleepRecord]>,
    ) -> anyhow::Result<WakeCheckResult> {
        let sleep = session::parse_sleep_record(session)?;

        let result = match history_override {
            Some(history) => score_sleep(&sleep, history),
            None => score_sleep(&sleep, &self.store.load()),
        };

        log::info!(
            "wake check for {}: score {}/{} ({} confidence), awake={}",
            sleep.date,
            result.score,
            result.max_score,
            result.confidence.label(),
            result.is_awake
        );

        if result.is_awake {
            self.store.upsert(sleep)?;
        }

        Ok(result)
    }

    /// Adds historical sessions to the store without scoring them. Sessions
    /// that cannot be parsed are skipped and reported.
    pub fn seed(&self, sessions: &[SleepSession]) -> anyhow::Result<SeedSummary> {
        let mut summary = SeedSummary::default();

        for session in sessions {
            match session::parse_sleep_record(session) {
                Ok(record) => {
                    let date = record.date;
                    self.store.upsert(record)?;
                    summary.seeded.push(date);
                }
                Err(err) => {
                    log::warn!("skipping sleep {}: {err}", session.label());
                    summary.skipped.push(SkippedSession {
                        id: session.label(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::scored_session;
    use crate::session::SessionError;
    use crate::store::tests::record_on;
    use crate::store::MemoryStore;
    use chrono::{Duration, NaiveDate};

    fn baseline_history(days: i64) -> Vec<SleepRecord> {
        let first = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        (0..days)
            .map(|offset| record_on(first + Duration::days(offset)))
            .collect()
    }

    fn candidate(
        end_utc_hour: u32,
        duration_hours: f64,
        cycles: u32,
        performance: f64,
    ) -> SleepRecord {
        SleepRecord {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end_utc_hour,
            duration_hours,
            cycles,
            performance,
            efficiency: 90.0,
        }
    }

    #[test]
    fn default_thresholds_match_cold_start_baseline() {
        let thresholds = derive_thresholds(&crate::stats::default_stats());
        assert_eq!(thresholds.end_hour_min, 11.0);
        assert_eq!(thresholds.duration_min, 4.9);
        assert_eq!(thresholds.cycles_min, 2.0);
        assert_eq!(thresholds.performance_min, 60.0);
    }

    #[test]
    fn cycles_threshold_never_drops_below_floor() {
        let mut stats = crate::stats::default_stats();
        for min_cycles in [0.0, 1.0, 2.0, 3.0] {
            stats.min_cycles = min_cycles;
            assert_eq!(derive_thresholds(&stats).cycles_min, 2.0);
        }
        stats.min_cycles = 6.0;
        assert_eq!(derive_thresholds(&stats).cycles_min, 5.0);
    }

    #[test]
    fn sleep_matching_full_baseline_is_awake_with_high_confidence() {
        let history = baseline_history(7);
        let result = score_sleep(&candidate(13, 7.5, 4, 82.0), &history);

        assert!(result.checks.iter().all(|c| c.passed));
        assert_eq!(result.score, 10);
        assert_eq!(result.max_score, 10);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.is_awake);
    }

    #[test]
    fn short_early_sleep_without_history_fails_every_check() {
        let result = score_sleep(&candidate(10, 2.0, 1, 40.0), &[]);

        let names: Vec<&str> = result.checks.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "end_hour_minimum",
                "end_hour_typical",
                "duration",
                "cycles",
                "performance"
            ]
        );
        assert!(result.checks.iter().all(|c| !c.passed && c.points == 0));
        assert_eq!(result.score, 0);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(!result.is_awake);
    }

    #[test]
    fn points_are_all_or_nothing() {
        let history = baseline_history(4);
        let result = score_sleep(&candidate(12, 7.5, 4, 50.0), &history);

        let weights = [3, 2, 2, 2, 1];
        for (check, weight) in result.checks.iter().zip(weights) {
            assert!(check.points == 0 || check.points == weight);
            assert_eq!(check.passed, check.points == weight);
        }
        // end_hour_minimum, duration and cycles pass.
        assert_eq!(result.score, 7);
        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.is_awake);
    }

    #[test]
    fn awake_result_is_written_back_to_history() -> anyhow::Result<()> {
        let detector = WakeDetector::new(MemoryStore::new(baseline_history(7)));
        let session = scored_session(
            "2026-03-03T05:30:00Z",
            "2026-03-03T13:15:00Z",
            7.5,
            4,
            82.0,
        );

        let result = detector.evaluate(&session, None)?;
        assert!(result.is_awake);
        let history = detector.store().load();
        assert_eq!(history.len(), 8);
        assert_eq!(history.last(), Some(&result.sleep));
        Ok(())
    }

    #[test]
    fn asleep_result_leaves_history_untouched() -> anyhow::Result<()> {
        let detector = WakeDetector::new(MemoryStore::new(baseline_history(7)));
        let session = scored_session(
            "2026-03-03T05:30:00Z",
            "2026-03-03T08:00:00Z",
            2.5,
            1,
            30.0,
        );

        let result = detector.evaluate(&session, None)?;
        assert!(!result.is_awake);
        assert_eq!(detector.store().load(), baseline_history(7));
        Ok(())
    }

    #[test]
    fn repeated_scoring_is_identical() {
        let history = baseline_history(5);
        let sleep = candidate(11, 6.0, 3, 70.0);
        assert_eq!(score_sleep(&sleep, &history), score_sleep(&sleep, &history));
    }

    #[test]
    fn history_override_replaces_stored_baseline() -> anyhow::Result<()> {
        let detector = WakeDetector::new(MemoryStore::default());
        let session = scored_session(
            "2026-03-03T05:30:00Z",
            "2026-03-03T13:15:00Z",
            7.5,
            4,
            82.0,
        );

        let history = baseline_history(7);
        let result = detector.evaluate(&session, Some(history.as_slice()))?;
        assert_eq!(result.stats.sample_size, 7);
        assert_eq!(detector.store().load(), vec![result.sleep.clone()]);
        Ok(())
    }

    #[test]
    fn invalid_session_is_reported() {
        let detector = WakeDetector::new(MemoryStore::default());
        let mut session = scored_session(
            "2026-03-03T05:30:00Z",
            "2026-03-03T13:15:00Z",
            7.5,
            4,
            82.0,
        );
        session.end = None;

        let err = detector.evaluate(&session, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SessionError>(),
            Some(&SessionError::InvalidInput("end"))
        );
        assert!(detector.store().load().is_empty());
    }

    #[test]
    fn seeding_skips_unparsable_sessions() -> anyhow::Result<()> {
        let detector = WakeDetector::new(MemoryStore::default());
        let night = |day: u32| {
            scored_session(
                &format!("2026-03-{day:02}T05:30:00Z"),
                &format!("2026-03-{day:02}T13:00:00Z"),
                7.5,
                4,
                80.0,
            )
        };
        let first = night(1);
        let mut broken = night(2);
        broken.score = None;
        let third = night(3);

        let summary = detector.seed(&[first, broken, third])?;
        assert_eq!(summary.seeded.len(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].id, "sleep-2026-03-02T05:30:00Z");

        let dates: Vec<NaiveDate> = detector.store().load().iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            ]
        );
        Ok(())
    }
}
