//! Core domain types for the Liftlog workout tracker.
//!
//! This module defines the records kept by the store:
//! - Exercises and the targets the session engine progresses
//! - Log entries written once per completed session
//! - Daily notes and keyed settings records
//!
//! Field names serialize in camelCase so backups stay compatible with the
//! browser version of the tracker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Store-assigned exercise id
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ExerciseId(pub u64);

impl fmt::Display for ExerciseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned log entry id
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LogId(pub u64);

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Weekdays
// ============================================================================

/// Day of the week an exercise is scheduled on
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    #[serde(alias = "Montag")]
    Monday,
    #[serde(alias = "Dienstag")]
    Tuesday,
    #[serde(alias = "Mittwoch")]
    Wednesday,
    #[serde(alias = "Donnerstag")]
    Thursday,
    #[serde(alias = "Freitag")]
    Friday,
    #[serde(alias = "Samstag")]
    Saturday,
    #[serde(alias = "Sonntag")]
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday of a calendar date
    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = crate::Error;

    /// Accepts full or three-letter English names and the German labels
    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monday" | "mon" | "montag" => Ok(Weekday::Monday),
            "tuesday" | "tue" | "dienstag" => Ok(Weekday::Tuesday),
            "wednesday" | "wed" | "mittwoch" => Ok(Weekday::Wednesday),
            "thursday" | "thu" | "donnerstag" => Ok(Weekday::Thursday),
            "friday" | "fri" | "freitag" => Ok(Weekday::Friday),
            "saturday" | "sat" | "samstag" => Ok(Weekday::Saturday),
            "sunday" | "sun" | "sonntag" => Ok(Weekday::Sunday),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown weekday '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// Exercises
// ============================================================================

/// Which stored target a session outcome progresses
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    /// `target_time`, in seconds
    Time,
    /// `target_weight`, in kilograms
    Weight,
}

/// A training movement definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    #[serde(default)]
    pub days: BTreeSet<Weekday>,
    #[serde(default = "default_target_sets")]
    pub target_sets: u32,
    #[serde(default)]
    pub target_reps: u32,
    #[serde(default)]
    pub target_weight: f64,
    #[serde(default)]
    pub target_time: i64,
    #[serde(default)]
    pub rest_time: i64,
    #[serde(default)]
    pub is_weight: bool,
    #[serde(default)]
    pub is_time: bool,
}

fn default_target_sets() -> u32 {
    1
}

impl Exercise {
    /// The target a confirmed progression delta is applied to.
    ///
    /// Timed exercises progress their duration; otherwise weight-tracked
    /// exercises progress their load. Plain rep exercises have none.
    pub fn progression_field(&self) -> Option<TargetField> {
        if self.is_time {
            Some(TargetField::Time)
        } else if self.is_weight {
            Some(TargetField::Weight)
        } else {
            None
        }
    }

    pub fn target_value(&self, field: TargetField) -> f64 {
        match field {
            TargetField::Time => self.target_time as f64,
            TargetField::Weight => self.target_weight,
        }
    }

    pub fn set_target_value(&mut self, field: TargetField, value: f64) {
        match field {
            TargetField::Time => self.target_time = value.round() as i64,
            TargetField::Weight => self.target_weight = value,
        }
    }
}

/// Exercise fields before the store assigns an id
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewExercise {
    pub name: String,
    pub days: BTreeSet<Weekday>,
    pub target_sets: u32,
    pub target_reps: u32,
    pub target_weight: f64,
    pub target_time: i64,
    pub rest_time: i64,
    pub is_weight: bool,
    pub is_time: bool,
}

impl NewExercise {
    /// Reject definitions the session engine cannot run
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::InvalidInput("exercise name is empty".into()));
        }
        if self.target_sets == 0 {
            return Err(crate::Error::InvalidInput(
                "target sets must be at least 1".into(),
            ));
        }
        if self.rest_time < 0 {
            return Err(crate::Error::InvalidInput(
                "rest time cannot be negative".into(),
            ));
        }
        if self.is_time && self.target_time < 0 {
            return Err(crate::Error::InvalidInput(
                "target time cannot be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn with_id(self, id: ExerciseId) -> Exercise {
        Exercise {
            id,
            name: self.name,
            days: self.days,
            target_sets: self.target_sets,
            target_reps: self.target_reps,
            target_weight: self.target_weight,
            target_time: self.target_time,
            rest_time: self.rest_time,
            is_weight: self.is_weight,
            is_time: self.is_time,
        }
    }
}

impl From<Exercise> for NewExercise {
    fn from(exercise: Exercise) -> Self {
        NewExercise {
            name: exercise.name,
            days: exercise.days,
            target_sets: exercise.target_sets,
            target_reps: exercise.target_reps,
            target_weight: exercise.target_weight,
            target_time: exercise.target_time,
            rest_time: exercise.rest_time,
            is_weight: exercise.is_weight,
            is_time: exercise.is_time,
        }
    }
}

// ============================================================================
// Logs, notes and settings
// ============================================================================

/// One completed exercise instance on one date.
///
/// Numeric fields default to zero so partially filled records from older
/// backups still load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogId,
    pub date: NaiveDate,
    pub exercise_id: ExerciseId,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub rpe: f64,
}

/// Log entry fields before the store assigns an id
#[derive(Clone, Debug, PartialEq)]
pub struct NewLogEntry {
    pub date: NaiveDate,
    pub exercise_id: ExerciseId,
    pub weight: Option<f64>,
    pub time: Option<i64>,
    pub reps: u32,
    pub sets: u32,
    pub rpe: f64,
}

impl NewLogEntry {
    pub fn with_id(self, id: LogId) -> LogEntry {
        LogEntry {
            id,
            date: self.date,
            exercise_id: self.exercise_id,
            weight: self.weight,
            time: self.time,
            reps: self.reps,
            sets: self.sets,
            rpe: self.rpe,
        }
    }
}

/// Free-text note keyed by calendar date
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DailyNote {
    pub date: NaiveDate,
    #[serde(default)]
    pub note: String,
}

/// A keyed settings record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub id: String,
    pub value: serde_json::Value,
}

/// User profile, stored under the `profile` settings key
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body_weight: Option<f64>,
    #[serde(default)]
    pub training_days: BTreeSet<Weekday>,
}

impl UserProfile {
    pub const SETTINGS_KEY: &'static str = "profile";

    /// Find the profile among settings records; unreadable values fall back to defaults
    pub fn from_settings(records: &[Settings]) -> Self {
        records
            .iter()
            .find(|r| r.id == Self::SETTINGS_KEY)
            .and_then(|r| match serde_json::from_value(r.value.clone()) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable profile settings: {}", e);
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn to_settings(&self) -> crate::Result<Settings> {
        Ok(Settings {
            id: Self::SETTINGS_KEY.to_string(),
            value: serde_json::to_value(self)?,
        })
    }
}
