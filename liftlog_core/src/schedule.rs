//! Weekly plan: which exercises are due on a date and which are done.

use crate::store::{FileStore, Store};
use crate::{Exercise, ExerciseId, Result, Weekday};
use chrono::NaiveDate;
use std::collections::HashSet;

/// An exercise scheduled on the requested date
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedExercise {
    pub exercise: Exercise,
    /// A log exists for this exercise on the date
    pub completed: bool,
}

/// Exercises whose training days include the weekday of `date`, ordered by id
pub fn todays_plan(store: &FileStore, date: NaiveDate) -> Result<Vec<PlannedExercise>> {
    let weekday = Weekday::of(date);
    let done: HashSet<ExerciseId> = store
        .logs_by_date(date)?
        .into_iter()
        .map(|log| log.exercise_id)
        .collect();

    let plan: Vec<PlannedExercise> = store
        .exercises()?
        .into_iter()
        .filter(|e| e.days.contains(&weekday))
        .map(|exercise| PlannedExercise {
            completed: done.contains(&exercise.id),
            exercise,
        })
        .collect();

    tracing::debug!("{} exercises planned for {} ({})", plan.len(), date, weekday);
    Ok(plan)
}

/// Whether an exercise was logged on a date
pub fn completed_on<S: Store + ?Sized>(store: &S, id: ExerciseId, date: NaiveDate) -> Result<bool> {
    Ok(store
        .logs_by_date(date)?
        .iter()
        .any(|log| log.exercise_id == id))
}
