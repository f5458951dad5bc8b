//! Progress summaries over a trailing window of logs.

use crate::store::{SortOrder, Store};
use crate::{Error, ExerciseId, Result, TargetField};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Default length of the progress window
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// One logged session in a progress series
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Summary of recent performance for one exercise
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub exercise_id: ExerciseId,
    /// Whether values are seconds or kilograms
    pub field: TargetField,
    pub points: Vec<ProgressPoint>,
    pub max: f64,
    pub total_sessions: usize,
    /// Mean value, rounded to one decimal
    pub average: f64,
}

/// Performed time (timed exercises) or weight per session since
/// `today - window_days`, oldest first. Missing values count as zero.
///
/// A negative window, or one reaching before the earliest representable
/// date, is rejected.
pub fn progress<S: Store + ?Sized>(
    store: &S,
    exercise_id: ExerciseId,
    today: NaiveDate,
    window_days: i64,
) -> Result<ProgressSummary> {
    let exercise = store
        .get_exercise(exercise_id)?
        .ok_or(Error::ExerciseNotFound(exercise_id))?;
    let field = if exercise.is_time {
        TargetField::Time
    } else {
        TargetField::Weight
    };

    let cutoff = window_start(today, window_days)?;
    let points: Vec<ProgressPoint> = store
        .logs_by_exercise(exercise_id, SortOrder::Ascending, None)?
        .into_iter()
        .filter(|log| log.date >= cutoff)
        .map(|log| ProgressPoint {
            date: log.date,
            value: match field {
                TargetField::Time => log.time.unwrap_or(0) as f64,
                TargetField::Weight => log.weight.unwrap_or(0.0),
            },
        })
        .collect();

    let total_sessions = points.len();
    let (max, average) = if points.is_empty() {
        (0.0, 0.0)
    } else {
        let max = points.iter().map(|p| p.value).fold(f64::MIN, f64::max);
        let sum: f64 = points.iter().map(|p| p.value).sum();
        (max, round_one_decimal(sum / total_sessions as f64))
    };

    Ok(ProgressSummary {
        exercise_id,
        field,
        points,
        max,
        total_sessions,
        average,
    })
}

fn window_start(today: NaiveDate, window_days: i64) -> Result<NaiveDate> {
    if window_days < 0 {
        return Err(Error::InvalidInput(format!(
            "window must not be negative, got {} days",
            window_days
        )));
    }
    Duration::try_days(window_days)
        .and_then(|window| today.checked_sub_signed(window))
        .ok_or_else(|| {
            Error::InvalidInput(format!("window of {} days is out of range", window_days))
        })
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileStore, NewExercise, NewLogEntry};
    use std::collections::BTreeSet;

    fn wall_sit() -> NewExercise {
        NewExercise {
            name: "Wall Sit".into(),
            days: BTreeSet::new(),
            target_sets: 1,
            target_reps: 0,
            target_weight: 0.0,
            target_time: 60,
            rest_time: 0,
            is_weight: false,
            is_time: true,
        }
    }

    fn timed_log(id: ExerciseId, date: NaiveDate, time: Option<i64>) -> NewLogEntry {
        NewLogEntry {
            date,
            exercise_id: id,
            weight: None,
            time,
            reps: 0,
            sets: 1,
            rpe: 8.0,
        }
    }

    #[test]
    fn test_progress_over_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path()).unwrap();
        let id = store.add_exercise(wall_sit()).unwrap().id;
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        // Outside the window
        store
            .add_log(timed_log(id, today - Duration::days(31), Some(500)))
            .unwrap();
        store
            .add_log(timed_log(id, today - Duration::days(2), Some(70)))
            .unwrap();
        store
            .add_log(timed_log(id, today - Duration::days(30), Some(60)))
            .unwrap();
        store.add_log(timed_log(id, today, None)).unwrap();

        let summary = progress(&store, id, today, DEFAULT_WINDOW_DAYS).unwrap();
        assert_eq!(summary.field, TargetField::Time);
        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.max, 70.0);
        assert_eq!(summary.average, 43.3);

        let values: Vec<f64> = summary.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![60.0, 70.0, 0.0]);
    }

    #[test]
    fn test_progress_without_logs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path()).unwrap();
        let id = store.add_exercise(wall_sit()).unwrap().id;

        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let summary = progress(&store, id, today, DEFAULT_WINDOW_DAYS).unwrap();
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.max, 0.0);
        assert_eq!(summary.average, 0.0);
        assert!(summary.points.is_empty());
    }

    #[test]
    fn test_progress_rejects_out_of_range_windows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(temp_dir.path()).unwrap();
        let id = store.add_exercise(wall_sit()).unwrap().id;
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        for days in [-1, i64::MAX, 1_000_000_000] {
            assert!(matches!(
                progress(&store, id, today, days),
                Err(Error::InvalidInput(_))
            ));
        }
        assert!(progress(&store, id, today, 0).is_ok());
        assert!(progress(&store, id, today, 100_000).is_ok());
    }

    #[test]
    fn test_progress_for_missing_exercise() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        assert!(matches!(
            progress(&store, ExerciseId(7), today, DEFAULT_WINDOW_DAYS),
            Err(Error::ExerciseNotFound(ExerciseId(7)))
        ));
    }
}
