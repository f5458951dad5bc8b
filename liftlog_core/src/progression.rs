//! Progression advice derived from recent log history.
//!
//! Two pure rules drive progressive overload:
//! - Before a session, [`recommend`] looks at the newest logs and suggests a
//!   deload after a streak of very hard sessions, or a double step after an
//!   easy one.
//! - After the last set, [`suggest_delta`] seeds the target adjustment from
//!   the RPE the user reports. The user may still override it.
//!
//! Nothing here writes to the store; the session engine applies whatever
//! delta the user confirms.

use crate::config::{DeltaRange, ProgressionConfig};
use crate::{Exercise, LogEntry, TargetField};
use serde::Serialize;

/// Why a pre-session recommendation was made
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Recent sessions were all at the limit; back off
    Burnout,
    /// The last session was easy; progress faster
    Overload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Info,
}

/// Advice shown before the first set
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: Severity,
    /// Target the delta refers to; `None` for plain rep exercises
    pub field: Option<TargetField>,
    pub delta: f64,
    pub message: String,
}

/// Normal progression increment for an exercise
pub fn base_step(exercise: &Exercise, config: &ProgressionConfig) -> f64 {
    if exercise.is_time {
        config.time_step_seconds
    } else {
        config.weight_step_kg
    }
}

/// Range offered for manually adjusting the delta
pub fn delta_range(exercise: &Exercise, config: &ProgressionConfig) -> DeltaRange {
    if exercise.is_time {
        config.time_range
    } else {
        config.weight_range
    }
}

/// Pre-session recommendation from logs ordered newest first.
///
/// Burnout protection takes precedence: if the newest `burnout_window` logs
/// all reached `burnout_rpe`, a deload is recommended (a flat number of
/// seconds for timed exercises, a rounded fraction of the weight otherwise).
/// Failing that, an easy last session recommends twice the base step.
pub fn recommend(
    exercise: &Exercise,
    recent: &[LogEntry],
    config: &ProgressionConfig,
) -> Option<Recommendation> {
    let window = config.burnout_window;
    let burned_out = window > 0
        && recent.len() >= window
        && recent
            .iter()
            .take(window)
            .all(|log| log.rpe >= config.burnout_rpe);

    if burned_out {
        let (delta, unit) = if exercise.is_time {
            (-config.deload_time_seconds, "s")
        } else {
            (-(exercise.target_weight * config.deload_fraction).round(), "kg")
        };
        tracing::debug!(
            "Burnout detected for exercise {}: deload {}",
            exercise.id,
            delta
        );
        return Some(Recommendation {
            kind: RecommendationKind::Burnout,
            severity: Severity::Critical,
            field: exercise.progression_field(),
            delta,
            message: format!(
                "Last {} sessions at RPE {} or higher. Deload by {}{} to recover.",
                window,
                config.burnout_rpe,
                delta.abs(),
                unit
            ),
        });
    }

    let latest = recent.first()?;
    if latest.rpe > 0.0 && latest.rpe <= config.easy_rpe {
        let delta = 2.0 * base_step(exercise, config);
        tracing::debug!(
            "Easy last session for exercise {} (RPE {}): overload {}",
            exercise.id,
            latest.rpe,
            delta
        );
        return Some(Recommendation {
            kind: RecommendationKind::Overload,
            severity: Severity::Info,
            field: exercise.progression_field(),
            delta,
            message: format!(
                "Last session felt easy (RPE {}). Try +{} this time.",
                latest.rpe, delta
            ),
        });
    }

    None
}

/// Seed for the post-session target adjustment
///
/// - RPE at or below `easy_rpe`: twice the base step
/// - up to `hard_rpe`: the base step
/// - above: hold the target
pub fn suggest_delta(reported_rpe: f64, exercise: &Exercise, config: &ProgressionConfig) -> f64 {
    let base = base_step(exercise, config);
    if reported_rpe <= config.easy_rpe {
        2.0 * base
    } else if reported_rpe <= config.hard_rpe {
        base
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExerciseId, LogId, NewExercise};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn exercise(is_weight: bool, is_time: bool) -> Exercise {
        NewExercise {
            name: "Deadlift".into(),
            days: BTreeSet::new(),
            target_sets: 3,
            target_reps: 5,
            target_weight: 100.0,
            target_time: 45,
            rest_time: 120,
            is_weight,
            is_time,
        }
        .with_id(ExerciseId(1))
    }

    /// Logs newest first with the given RPEs
    fn history(rpes: &[f64]) -> Vec<LogEntry> {
        rpes.iter()
            .enumerate()
            .map(|(i, rpe)| LogEntry {
                id: LogId(100 - i as u64),
                date: NaiveDate::from_ymd_opt(2024, 6, 20 - i as u32).unwrap(),
                exercise_id: ExerciseId(1),
                weight: Some(100.0),
                time: None,
                reps: 5,
                sets: 3,
                rpe: *rpe,
            })
            .collect()
    }

    #[test]
    fn test_burnout_deloads_weight_by_ten_percent() {
        let config = ProgressionConfig::default();
        let rec = recommend(&exercise(true, false), &history(&[9.5, 9.0, 10.0, 6.0]), &config)
            .unwrap();

        assert_eq!(rec.kind, RecommendationKind::Burnout);
        assert_eq!(rec.severity, Severity::Critical);
        assert_eq!(rec.field, Some(TargetField::Weight));
        assert_eq!(rec.delta, -10.0);
    }

    #[test]
    fn test_burnout_rounds_to_whole_units() {
        let config = ProgressionConfig::default();
        let mut ex = exercise(true, false);
        ex.target_weight = 47.5;

        let rec = recommend(&ex, &history(&[9.0, 9.0, 9.0]), &config).unwrap();
        assert_eq!(rec.delta, -5.0);
    }

    #[test]
    fn test_burnout_deloads_time_by_flat_seconds() {
        let config = ProgressionConfig::default();
        let rec = recommend(&exercise(false, true), &history(&[9.5, 9.5, 9.5]), &config).unwrap();

        assert_eq!(rec.field, Some(TargetField::Time));
        assert_eq!(rec.delta, -10.0);
    }

    #[test]
    fn test_single_moderate_log_suppresses_burnout() {
        let config = ProgressionConfig::default();
        let rec = recommend(&exercise(true, false), &history(&[9.5, 8.9, 9.5]), &config);
        assert!(rec.is_none());
    }

    #[test]
    fn test_burnout_needs_full_window() {
        let config = ProgressionConfig::default();
        assert!(recommend(&exercise(true, false), &history(&[9.5, 9.5]), &config).is_none());
    }

    #[test]
    fn test_easy_session_recommends_double_step() {
        let config = ProgressionConfig::default();

        let weight = recommend(&exercise(true, false), &history(&[6.0, 9.5]), &config).unwrap();
        assert_eq!(weight.kind, RecommendationKind::Overload);
        assert_eq!(weight.severity, Severity::Info);
        assert_eq!(weight.delta, 5.0);

        let time = recommend(&exercise(false, true), &history(&[5.5]), &config).unwrap();
        assert_eq!(time.delta, 10.0);
    }

    #[test]
    fn test_unrated_or_moderate_session_has_no_recommendation() {
        let config = ProgressionConfig::default();
        assert!(recommend(&exercise(true, false), &history(&[0.0]), &config).is_none());
        assert!(recommend(&exercise(true, false), &history(&[7.0]), &config).is_none());
        assert!(recommend(&exercise(true, false), &[], &config).is_none());
    }

    #[test]
    fn test_suggest_delta_bands() {
        let config = ProgressionConfig::default();
        let weighted = exercise(true, false);
        let timed = exercise(false, true);

        assert_eq!(suggest_delta(6.0, &weighted, &config), 5.0);
        assert_eq!(suggest_delta(7.0, &weighted, &config), 2.5);
        assert_eq!(suggest_delta(9.0, &weighted, &config), 2.5);
        assert_eq!(suggest_delta(9.5, &weighted, &config), 0.0);

        assert_eq!(suggest_delta(5.0, &timed, &config), 10.0);
        assert_eq!(suggest_delta(8.0, &timed, &config), 5.0);
        assert_eq!(suggest_delta(10.0, &timed, &config), 0.0);
    }

    #[test]
    fn test_suggest_delta_is_non_increasing_in_rpe() {
        let config = ProgressionConfig::default();
        for ex in [exercise(true, false), exercise(false, true), exercise(false, false)] {
            let deltas: Vec<f64> = (10..=20)
                .map(|half_points| suggest_delta(half_points as f64 / 2.0, &ex, &config))
                .collect();
            assert!(
                deltas.windows(2).all(|w| w[0] >= w[1]),
                "deltas not monotonic: {:?}",
                deltas
            );
        }
    }

    #[test]
    fn test_delta_range_follows_mode() {
        let config = ProgressionConfig::default();
        assert_eq!(delta_range(&exercise(false, true), &config).step, 5.0);
        assert_eq!(delta_range(&exercise(true, false), &config).step, 1.25);
    }
}
