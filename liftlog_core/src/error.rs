//! Error types for the liftlog_core library.

use crate::ExerciseId;
use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The referenced exercise does not exist (or was deleted)
    #[error("Exercise {0} not found")]
    ExerciseNotFound(ExerciseId),

    /// A session for this exercise is already logged on the date
    #[error("Exercise {exercise} was already logged on {date}")]
    AlreadyLogged { exercise: ExerciseId, date: NaiveDate },

    /// Countdown misconfiguration
    #[error("Timer error: {0}")]
    Timer(String),

    /// Session operation not allowed in the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// Rejected user input (RPE, delta, exercise definition)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(String),

    /// Backup file is not in the expected format
    #[error("Import error: {0}")]
    Import(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
