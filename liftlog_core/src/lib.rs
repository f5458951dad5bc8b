#![forbid(unsafe_code)]

//! Core domain model and business logic for the Liftlog workout tracker.
//!
//! This crate provides:
//! - Domain types (exercises, log entries, daily notes, settings)
//! - Persistence (file-backed store, log journal, collection snapshots)
//! - Progression advice (burnout deloads, RPE-driven target deltas)
//! - The countdown timer and the per-exercise session engine
//! - Statistics, scheduling and backup/export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod journal;
pub mod snapshot;
pub mod store;
pub mod timer;
pub mod progression;
pub mod session;
pub mod schedule;
pub mod stats;
pub mod backup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use store::{FileStore, SortOrder, Store};
pub use timer::{Countdown, Ticker};
pub use progression::{recommend, suggest_delta, Recommendation, RecommendationKind, Severity};
pub use session::{Feedback, SessionEngine, SessionState};
