//! Persistence store for exercises, logs, daily notes and settings.
//!
//! The session engine only needs the narrow [`Store`] trait. [`FileStore`]
//! implements it over a data directory and additionally offers the CRUD
//! operations used by the CLI and the all-or-nothing bulk replacement used
//! by backup import.
//!
//! Layout of a store directory:
//! - `meta.json`: schema version
//! - `exercises.json`, `settings.json`, `daily_notes.json`: snapshots
//! - `logs.jsonl`: append-only log journal

use crate::journal::LogJournal;
use crate::snapshot::{
    load_collection, save_collection, stage_collection, update_collection, StagedFile,
};
use crate::{
    DailyNote, Error, Exercise, ExerciseId, LogEntry, LogId, NewExercise, NewLogEntry, Result,
    Settings, TargetField,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 3;

/// Ordering of log queries by date
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Operations the session engine and the advisors need from persistence
pub trait Store {
    /// Look up an exercise; `None` if it does not exist (e.g. was deleted)
    fn get_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>>;

    /// Overwrite one target of an exercise
    fn update_exercise_target(
        &mut self,
        id: ExerciseId,
        field: TargetField,
        value: f64,
    ) -> Result<()>;

    /// Append a log entry, returning its generated id
    fn add_log(&mut self, entry: NewLogEntry) -> Result<LogId>;

    /// Logs of one exercise ordered by date (ties by id), optionally truncated
    fn logs_by_exercise(
        &self,
        id: ExerciseId,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>>;

    /// All logs recorded on a date
    fn logs_by_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    schema_version: u32,
}

/// Directory-backed store
pub struct FileStore {
    root: PathBuf,
    journal: LogJournal,
}

impl FileStore {
    /// Open (or create) a store directory, upgrading older schema markers
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let meta_path = root.join("meta.json");
        let version = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_slice(&std::fs::read(&meta_path)?)?;
            meta.schema_version
        } else {
            0
        };

        if version > SCHEMA_VERSION {
            return Err(Error::Store(format!(
                "store schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        if version < SCHEMA_VERSION {
            if version > 0 {
                tracing::info!(
                    "Upgrading store at {:?} from schema {} to {}",
                    root,
                    version,
                    SCHEMA_VERSION
                );
            }
            let meta = StoreMeta {
                schema_version: SCHEMA_VERSION,
            };
            std::fs::write(&meta_path, serde_json::to_vec(&meta)?)?;
        }

        tracing::debug!("Opened store at {:?}", root);
        Ok(Self {
            journal: LogJournal::new(root.join("logs.jsonl")),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn exercises_path(&self) -> PathBuf {
        self.root.join("exercises.json")
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    fn notes_path(&self) -> PathBuf {
        self.root.join("daily_notes.json")
    }

    // ------------------------------------------------------------------
    // Exercises
    // ------------------------------------------------------------------

    /// All exercises ordered by id
    pub fn exercises(&self) -> Result<Vec<Exercise>> {
        let mut exercises: Vec<Exercise> = load_collection(&self.exercises_path())?;
        exercises.sort_by_key(|e| e.id);
        Ok(exercises)
    }

    pub fn add_exercise(&mut self, new: NewExercise) -> Result<Exercise> {
        new.validate()?;
        let exercise = update_collection(&self.exercises_path(), |exercises: &mut Vec<Exercise>| {
            let next_id = exercises.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
            let exercise = new.with_id(ExerciseId(next_id));
            exercises.push(exercise.clone());
            Ok(exercise)
        })?;
        tracing::info!("Added exercise {} ({})", exercise.id, exercise.name);
        Ok(exercise)
    }

    pub fn update_exercise(&mut self, id: ExerciseId, changes: NewExercise) -> Result<Exercise> {
        changes.validate()?;
        update_collection(&self.exercises_path(), |exercises: &mut Vec<Exercise>| {
            let slot = exercises
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(Error::ExerciseNotFound(id))?;
            *slot = changes.with_id(id);
            Ok(slot.clone())
        })
    }

    /// Remove an exercise. Its logs are kept and become dangling references.
    pub fn delete_exercise(&mut self, id: ExerciseId) -> Result<()> {
        update_collection(&self.exercises_path(), |exercises: &mut Vec<Exercise>| {
            let before = exercises.len();
            exercises.retain(|e| e.id != id);
            if exercises.len() == before {
                return Err(Error::ExerciseNotFound(id));
            }
            Ok(())
        })?;
        tracing::info!("Deleted exercise {}", id);
        Ok(())
    }

    pub fn replace_exercises(&mut self, exercises: &[Exercise]) -> Result<()> {
        save_collection(&self.exercises_path(), exercises)
    }

    // ------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------

    /// Every log entry ordered by date, then id
    pub fn logs(&self) -> Result<Vec<LogEntry>> {
        let mut logs = self.journal.read_all()?;
        logs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(logs)
    }


    // ------------------------------------------------------------------
    // Daily notes
    // ------------------------------------------------------------------

    /// Set the note for a date; an empty text removes it
    pub fn upsert_note(&mut self, date: NaiveDate, text: &str) -> Result<()> {
        update_collection(&self.notes_path(), |notes: &mut Vec<DailyNote>| {
            notes.retain(|n| n.date != date);
            if !text.trim().is_empty() {
                notes.push(DailyNote {
                    date,
                    note: text.to_string(),
                });
            }
            notes.sort_by_key(|n| n.date);
            Ok(())
        })
    }

    pub fn note(&self, date: NaiveDate) -> Result<Option<DailyNote>> {
        Ok(self.notes()?.into_iter().find(|n| n.date == date))
    }

    pub fn notes(&self) -> Result<Vec<DailyNote>> {
        load_collection(&self.notes_path())
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn settings(&self) -> Result<Vec<Settings>> {
        load_collection(&self.settings_path())
    }

    /// Insert or overwrite the record with the same key
    pub fn put_settings(&mut self, record: Settings) -> Result<()> {
        update_collection(&self.settings_path(), |records: &mut Vec<Settings>| {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Bulk replacement
    // ------------------------------------------------------------------

    /// Swap in several collections as one unit.
    ///
    /// Every replacement is written to a temp file before any is moved into
    /// place. If a move fails, the files already moved are restored.
    pub fn replace_all(&mut self, replacement: Replacement<'_>) -> Result<()> {
        let mut staged = Vec::new();
        if let Some(exercises) = replacement.exercises {
            staged.push(stage_collection(&self.exercises_path(), exercises)?);
        }
        if let Some(logs) = replacement.logs {
            staged.push(self.journal.stage_replace(logs)?);
        }
        if let Some(notes) = replacement.daily_notes {
            staged.push(stage_collection(&self.notes_path(), notes)?);
        }
        if let Some(settings) = replacement.settings {
            staged.push(stage_collection(&self.settings_path(), settings)?);
        }

        let previous = staged
            .iter()
            .map(|file| read_previous(file.path()))
            .collect::<Result<Vec<_>>>()?;

        let mut committed = Vec::with_capacity(staged.len());
        for (file, before) in staged.into_iter().zip(previous) {
            let path = file.path().to_path_buf();
            if let Err(e) = file.commit() {
                tracing::warn!("Replacing {:?} failed, rolling back: {}", path, e);
                restore(committed);
                return Err(e);
            }
            committed.push((path, before));
        }

        tracing::info!("Replaced {} collections in {:?}", committed.len(), self.root);
        Ok(())
    }
}

/// Collections for [`FileStore::replace_all`]; `None` keeps the current one
#[derive(Clone, Copy, Debug, Default)]
pub struct Replacement<'a> {
    pub exercises: Option<&'a [Exercise]>,
    pub settings: Option<&'a [Settings]>,
    pub logs: Option<&'a [LogEntry]>,
    pub daily_notes: Option<&'a [DailyNote]>,
}

fn read_previous(path: &Path) -> Result<Option<Vec<u8>>> {
    if path.is_file() {
        Ok(Some(std::fs::read(path)?))
    } else {
        Ok(None)
    }
}

fn restore(committed: Vec<(PathBuf, Option<Vec<u8>>)>) {
    for (path, before) in committed.into_iter().rev() {
        let result = match before {
            Some(bytes) => StagedFile::write(&path, |writer| Ok(writer.write_all(&bytes)?))
                .and_then(StagedFile::commit),
            None => std::fs::remove_file(&path).map_err(Error::from),
        };
        if let Err(e) = result {
            tracing::warn!("Could not restore {:?}: {}", path, e);
        }
    }
}

impl Store for FileStore {
    fn get_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>> {
        Ok(self.exercises()?.into_iter().find(|e| e.id == id))
    }

    fn update_exercise_target(
        &mut self,
        id: ExerciseId,
        field: TargetField,
        value: f64,
    ) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidInput(format!("target value {} is not finite", value)));
        }
        update_collection(&self.exercises_path(), |exercises: &mut Vec<Exercise>| {
            let exercise = exercises
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or(Error::ExerciseNotFound(id))?;
            exercise.set_target_value(field, value);
            Ok(())
        })?;
        tracing::debug!("Set {:?} target of exercise {} to {}", field, id, value);
        Ok(())
    }

    fn add_log(&mut self, entry: NewLogEntry) -> Result<LogId> {
        Ok(self.journal.append(entry)?.id)
    }

    fn logs_by_exercise(
        &self,
        id: ExerciseId,
        order: SortOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogEntry>> {
        let mut logs: Vec<LogEntry> = self
            .logs()?
            .into_iter()
            .filter(|l| l.exercise_id == id)
            .collect();
        if order == SortOrder::Descending {
            logs.reverse();
        }
        if let Some(limit) = limit {
            logs.truncate(limit);
        }
        Ok(logs)
    }

    fn logs_by_date(&self, date: NaiveDate) -> Result<Vec<LogEntry>> {
        Ok(self
            .journal
            .read_all()?
            .into_iter()
            .filter(|l| l.date == date)
            .collect())
    }
}
