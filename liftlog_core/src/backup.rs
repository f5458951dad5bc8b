//! Backup export/import and CSV export.
//!
//! The JSON backup carries every collection of the store plus a small meta
//! header. Importing replaces each collection present in the document as
//! one unit; collections the document leaves out are not touched. Both
//! directions record the backup time under the `lastBackup` settings key.

use crate::store::{FileStore, Replacement};
use crate::{DailyNote, Error, Exercise, ExerciseId, LogEntry, Result, Settings};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub const BACKUP_VERSION: u32 = 1;
pub const APP_NAME: &str = "PWA Fitness Tracker";
/// Settings key holding the RFC 3339 time of the last export or import
pub const LAST_BACKUP_KEY: &str = "lastBackup";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupMeta {
    pub version: u32,
    pub app_name: String,
    /// RFC 3339 timestamp of the export
    #[serde(default)]
    pub date: String,
}

/// Backup document
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<BackupMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercises: Option<Vec<Exercise>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<Settings>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<LogEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_notes: Option<Vec<DailyNote>>,
}

/// Record counts of an import or export
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub exercises: usize,
    pub settings: usize,
    pub logs: usize,
    pub daily_notes: usize,
}

impl Backup {
    /// Snapshot of every collection in the store
    pub fn from_store(store: &FileStore) -> Result<Self> {
        Ok(Backup {
            meta: Some(BackupMeta {
                version: BACKUP_VERSION,
                app_name: APP_NAME.to_string(),
                date: chrono::Utc::now().to_rfc3339(),
            }),
            exercises: Some(store.exercises()?),
            settings: Some(store.settings()?),
            logs: Some(store.logs()?),
            daily_notes: Some(store.notes()?),
        })
    }

    fn summary(&self) -> BackupSummary {
        BackupSummary {
            exercises: self.exercises.as_ref().map_or(0, Vec::len),
            settings: self.settings.as_ref().map_or(0, Vec::len),
            logs: self.logs.as_ref().map_or(0, Vec::len),
            daily_notes: self.daily_notes.as_ref().map_or(0, Vec::len),
        }
    }
}

/// Time of the last export or import, if any
pub fn last_backup(store: &FileStore) -> Result<Option<String>> {
    Ok(store
        .settings()?
        .into_iter()
        .find(|r| r.id == LAST_BACKUP_KEY)
        .and_then(|r| r.value.as_str().map(str::to_string)))
}

fn last_backup_record(timestamp: &str) -> Settings {
    Settings {
        id: LAST_BACKUP_KEY.to_string(),
        value: serde_json::Value::String(timestamp.to_string()),
    }
}

/// `fitness-backup-YYYY-MM-DD.json`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("fitness-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Write a pretty-printed backup of the whole store
pub fn export_json(store: &mut FileStore, path: &Path) -> Result<BackupSummary> {
    let backup = Backup::from_store(store)?;

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &backup)?;
    writer.flush()?;

    if let Some(meta) = &backup.meta {
        store.put_settings(last_backup_record(&meta.date))?;
    }

    let summary = backup.summary();
    tracing::info!("Exported backup to {:?}: {:?}", path, summary);
    Ok(summary)
}

/// Parse a backup document, rejecting anything without exercises or logs
pub fn read_backup(path: &Path) -> Result<Backup> {
    let reader = BufReader::new(File::open(path)?);
    let backup: Backup = serde_json::from_reader(reader)
        .map_err(|e| Error::Import(format!("{} is not a backup file: {}", path.display(), e)))?;

    if backup.exercises.is_none() && backup.logs.is_none() {
        return Err(Error::Import(format!(
            "{} contains neither exercises nor logs",
            path.display()
        )));
    }
    Ok(backup)
}

/// Replace the store's collections with those in a backup file.
///
/// The whole document is parsed before anything is written, and the
/// collections are swapped in all together or not at all.
pub fn import_json(store: &mut FileStore, path: &Path) -> Result<BackupSummary> {
    let backup = read_backup(path)?;

    if let Some(meta) = &backup.meta {
        if meta.version > BACKUP_VERSION {
            tracing::warn!(
                "Backup version {} is newer than {}; importing anyway",
                meta.version,
                BACKUP_VERSION
            );
        }
    }

    let backed_up_at = match &backup.meta {
        Some(meta) if !meta.date.is_empty() => meta.date.clone(),
        _ => chrono::Utc::now().to_rfc3339(),
    };
    let mut settings = match &backup.settings {
        Some(settings) => settings.clone(),
        None => store.settings()?,
    };
    settings.retain(|r| r.id != LAST_BACKUP_KEY);
    settings.push(last_backup_record(&backed_up_at));

    store.replace_all(Replacement {
        exercises: backup.exercises.as_deref(),
        settings: Some(&settings),
        logs: backup.logs.as_deref(),
        daily_notes: backup.daily_notes.as_deref(),
    })?;

    let summary = backup.summary();
    tracing::info!("Imported backup from {:?}: {:?}", path, summary);
    Ok(summary)
}

/// A row in the CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Exercise")]
    exercise: &'a str,
    #[serde(rename = "Sets")]
    sets: Option<u32>,
    #[serde(rename = "Reps")]
    reps: Option<u32>,
    #[serde(rename = "Time (s)")]
    time: Option<i64>,
    #[serde(rename = "Weight (kg)")]
    weight: Option<f64>,
    #[serde(rename = "Note")]
    note: &'a str,
}

/// Write every log as one CSV row, ordered by date.
///
/// Returns the number of rows written.
pub fn export_csv<W: Write>(store: &FileStore, writer: W) -> Result<usize> {
    let names: HashMap<ExerciseId, String> = store
        .exercises()?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();
    let notes: HashMap<NaiveDate, String> = store
        .notes()?
        .into_iter()
        .map(|n| (n.date, n.note))
        .collect();
    let logs = store.logs()?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    for log in &logs {
        csv_writer.serialize(CsvRow {
            date: log.date,
            exercise: names
                .get(&log.exercise_id)
                .map_or("unknown exercise", String::as_str),
            sets: Some(log.sets).filter(|v| *v != 0),
            reps: Some(log.reps).filter(|v| *v != 0),
            time: log.time.filter(|v| *v != 0),
            weight: log.weight.filter(|v| *v != 0.0),
            note: notes.get(&log.date).map_or("", String::as_str),
        })?;
    }

    if logs.is_empty() {
        csv_writer.write_record([
            "Date",
            "Exercise",
            "Sets",
            "Reps",
            "Time (s)",
            "Weight (kg)",
            "Note",
        ])?;
    }
    csv_writer.flush()?;

    tracing::info!("Exported {} log rows as CSV", logs.len());
    Ok(logs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::{NewExercise, NewLogEntry, UserProfile, Weekday};
    use std::collections::BTreeSet;

    fn populated_store(dir: &Path) -> FileStore {
        let mut store = FileStore::open(dir).unwrap();
        let squat = store
            .add_exercise(NewExercise {
                name: "Squat".into(),
                days: BTreeSet::from([Weekday::Tuesday]),
                target_sets: 3,
                target_reps: 5,
                target_weight: 80.0,
                target_time: 0,
                rest_time: 120,
                is_weight: true,
                is_time: false,
            })
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 6).unwrap();
        store
            .add_log(NewLogEntry {
                date,
                exercise_id: squat.id,
                weight: Some(80.0),
                time: None,
                reps: 5,
                sets: 3,
                rpe: 8.0,
            })
            .unwrap();
        store
            .add_log(NewLogEntry {
                date,
                exercise_id: ExerciseId(99),
                weight: None,
                time: Some(30),
                reps: 0,
                sets: 1,
                rpe: 6.5,
            })
            .unwrap();
        store.upsert_note(date, "slept badly, still \"ok\", pushed").unwrap();

        let profile = UserProfile {
            name: Some("Robin".into()),
            body_weight: Some(72.5),
            training_days: BTreeSet::from([Weekday::Tuesday]),
        };
        store.put_settings(profile.to_settings().unwrap()).unwrap();
        store
    }

    #[test]
    fn test_default_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 6).unwrap();
        assert_eq!(default_file_name(date), "fitness-backup-2024-02-06.json");
    }

    #[test]
    fn test_export_import_reproduces_store() {
        let source_dir = tempfile::tempdir().unwrap();
        let mut source = populated_store(source_dir.path());
        let backup_path = source_dir.path().join("backup.json");

        let exported = export_json(&mut source, &backup_path).unwrap();
        assert_eq!(exported.logs, 2);

        let target_dir = tempfile::tempdir().unwrap();
        let mut target = FileStore::open(target_dir.path()).unwrap();
        let imported = import_json(&mut target, &backup_path).unwrap();
        assert_eq!(imported, exported);

        assert_eq!(target.exercises().unwrap(), source.exercises().unwrap());
        assert_eq!(target.logs().unwrap(), source.logs().unwrap());
        assert_eq!(target.notes().unwrap(), source.notes().unwrap());
        assert_eq!(target.settings().unwrap(), source.settings().unwrap());
    }

    #[test]
    fn test_backup_uses_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store(dir.path());
        let path = dir.path().join("backup.json");
        export_json(&mut store, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["meta"]["version"], 1);
        assert_eq!(json["meta"]["appName"], APP_NAME);
        assert_eq!(json["exercises"][0]["targetWeight"], 80.0);
        assert_eq!(json["logs"][0]["exerciseId"], 1);
        assert!(json["dailyNotes"].is_array());
    }

    #[test]
    fn test_import_rejects_foreign_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store(dir.path());
        let path = dir.path().join("other.json");
        std::fs::write(&path, r#"{"settings": [], "dailyNotes": []}"#).unwrap();

        assert!(matches!(
            import_json(&mut store, &path),
            Err(Error::Import(_))
        ));
        assert_eq!(store.logs().unwrap().len(), 2);
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            import_json(&mut store, &path),
            Err(Error::Import(_))
        ));
    }

    #[test]
    fn test_import_leaves_absent_collections_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store(dir.path());
        let path = dir.path().join("partial.json");
        std::fs::write(
            &path,
            r#"{"exercises": [{"id": 5, "name": "Plank", "isTime": true, "targetTime": 40}]}"#,
        )
        .unwrap();

        let summary = import_json(&mut store, &path).unwrap();
        assert_eq!(summary.exercises, 1);

        let exercises = store.exercises().unwrap();
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].id, ExerciseId(5));
        assert_eq!(exercises[0].target_sets, 1);
        assert_eq!(store.logs().unwrap().len(), 2);
        assert_eq!(store.notes().unwrap().len(), 1);
        assert!(store.get_exercise(ExerciseId(5)).unwrap().is_some());
    }

    #[test]
    fn test_backup_time_recorded_on_export_and_import() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store(dir.path());
        assert_eq!(last_backup(&store).unwrap(), None);

        let path = dir.path().join("backup.json");
        export_json(&mut store, &path).unwrap();
        let exported_at = last_backup(&store).unwrap().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&exported_at).is_ok());

        let older = dir.path().join("older.json");
        std::fs::write(
            &older,
            r#"{"meta": {"version": 1, "appName": "PWA Fitness Tracker", "date": "2023-12-24T08:00:00.000Z"},
                "exercises": [], "settings": [{"id": "lastBackup", "value": "2020-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        import_json(&mut store, &older).unwrap();
        assert_eq!(
            last_backup(&store).unwrap().as_deref(),
            Some("2023-12-24T08:00:00.000Z")
        );
        assert_eq!(store.settings().unwrap().len(), 1);
    }

    #[test]
    fn test_import_without_meta_keeps_profile_and_stamps_now() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = populated_store(dir.path());
        let path = dir.path().join("logs-only.json");
        std::fs::write(&path, r#"{"logs": []}"#).unwrap();

        import_json(&mut store, &path).unwrap();
        assert!(store.logs().unwrap().is_empty());
        assert_eq!(
            UserProfile::from_settings(&store.settings().unwrap()).name,
            Some("Robin".into())
        );
        assert!(last_backup(&store).unwrap().is_some());
    }

    #[test]
    fn test_failed_import_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store
            .add_exercise(NewExercise {
                name: "Deadlift".into(),
                days: BTreeSet::new(),
                target_sets: 1,
                target_reps: 5,
                target_weight: 100.0,
                target_time: 0,
                rest_time: 180,
                is_weight: true,
                is_time: false,
            })
            .unwrap();
        let exercises_before = std::fs::read(dir.path().join("exercises.json")).unwrap();

        // A directory where the journal belongs cannot be replaced
        let blocker = dir.path().join("logs.jsonl");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "x").unwrap();

        let path = dir.path().join("backup.json");
        std::fs::write(
            &path,
            r#"{"exercises": [{"id": 3, "name": "Plank", "isTime": true, "targetTime": 40}],
                "logs": [{"id": 1, "date": "2024-02-06", "exerciseId": 3, "time": 40, "sets": 1, "rpe": 7}],
                "dailyNotes": [{"date": "2024-02-06", "note": "new"}]}"#,
        )
        .unwrap();

        assert!(import_json(&mut store, &path).is_err());
        assert_eq!(
            std::fs::read(dir.path().join("exercises.json")).unwrap(),
            exercises_before
        );
        assert!(store.notes().unwrap().is_empty());
        assert!(store.settings().unwrap().is_empty());
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let store = populated_store(dir.path());

        let mut out = Vec::new();
        let rows = export_csv(&store, &mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Date,Exercise,Sets,Reps,Time (s),Weight (kg),Note");
        assert_eq!(
            lines[1],
            "2024-02-06,Squat,3,5,,80.0,\"slept badly, still \"\"ok\"\", pushed\""
        );
        assert!(lines[2].starts_with("2024-02-06,unknown exercise,1,,30,,"));
    }

    #[test]
    fn test_csv_export_without_logs_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let mut out = Vec::new();
        assert_eq!(export_csv(&store, &mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap().trim_end(),
            "Date,Exercise,Sets,Reps,Time (s),Weight (kg),Note"
        );
    }
}
