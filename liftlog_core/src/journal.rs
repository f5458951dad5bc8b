//! Append-only journal of log entries.
//!
//! Entries are appended to a JSONL (JSON Lines) file with file locking
//! so concurrent writers never interleave or reuse an id.

use crate::snapshot::StagedFile;
use crate::{Error, LogEntry, LogId, NewLogEntry, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// JSONL-backed log journal
pub struct LogJournal {
    path: PathBuf,
}

impl LogJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append a new entry, assigning the next free id.
    ///
    /// Refuses a second entry for the same exercise and date.
    pub fn append(&self, entry: NewLogEntry) -> Result<LogEntry> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // Held across the id scan and the write
        file.lock_exclusive()?;

        let result = (|| -> Result<LogEntry> {
            let existing = parse_entries(&file)?;
            if existing
                .iter()
                .any(|e| e.exercise_id == entry.exercise_id && e.date == entry.date)
            {
                return Err(Error::AlreadyLogged {
                    exercise: entry.exercise_id,
                    date: entry.date,
                });
            }
            let next_id = existing.iter().map(|e| e.id.0).max().unwrap_or(0) + 1;
            let entry = entry.with_id(LogId(next_id));

            let mut writer = BufWriter::new(&file);
            // A torn last line must not swallow the new entry
            if needs_line_break(&file)? {
                writer.write_all(b"\n")?;
            }
            let line = serde_json::to_string(&entry)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            file.sync_data()?;
            Ok(entry)
        })();

        file.unlock()?;

        let entry = result?;
        tracing::debug!("Appended log {} to journal", entry.id);
        Ok(entry)
    }

    /// Read every entry in file order
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        read_entries(&self.path)
    }

    /// Replace the whole journal, keeping the given ids
    pub fn replace(&self, entries: &[LogEntry]) -> Result<()> {
        self.stage_replace(entries)?.commit()?;
        tracing::debug!("Replaced journal with {} entries", entries.len());
        Ok(())
    }

    /// Write a replacement journal without moving it into place
    pub fn stage_replace(&self, entries: &[LogEntry]) -> Result<StagedFile> {
        StagedFile::write(&self.path, |writer| {
            for entry in entries {
                serde_json::to_writer(&mut *writer, entry)?;
                writer.write_all(b"\n")?;
            }
            Ok(())
        })
    }
}

/// Read all entries from a journal file
pub fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;
    let entries = parse_entries(&file);
    file.unlock()?;

    let entries = entries?;
    tracing::debug!("Read {} log entries from journal", entries.len());
    Ok(entries)
}

fn needs_line_break(mut file: &File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn parse_entries(file: &File) -> Result<Vec<LogEntry>> {
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<LogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable log at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExerciseId;
    use chrono::NaiveDate;

    fn create_test_entry(exercise: u64, day: u32) -> NewLogEntry {
        NewLogEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            exercise_id: ExerciseId(exercise),
            weight: Some(50.0),
            time: None,
            reps: 10,
            sets: 3,
            rpe: 7.5,
        }
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(temp_dir.path().join("logs.jsonl"));

        let first = journal.append(create_test_entry(1, 1)).unwrap();
        let second = journal.append(create_test_entry(2, 2)).unwrap();

        assert_eq!(first.id, LogId(1));
        assert_eq!(second.id, LogId(2));

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].exercise_id, ExerciseId(2));
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries = read_entries(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs.jsonl");
        let journal = LogJournal::new(&path);
        journal.append(create_test_entry(1, 1)).unwrap();

        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{ not json\n");
        std::fs::write(&path, contents).unwrap();

        let next = journal.append(create_test_entry(1, 2)).unwrap();
        assert_eq!(next.id, LogId(2));
        assert_eq!(journal.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_append_after_torn_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs.jsonl");
        let journal = LogJournal::new(&path);
        journal.append(create_test_entry(1, 1)).unwrap();

        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str(r#"{"id": 2, "date": "2024-03"#);
        std::fs::write(&path, contents).unwrap();

        journal.append(create_test_entry(1, 3)).unwrap();
        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].date, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
    }

    #[test]
    fn test_second_entry_for_same_day_is_refused() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(temp_dir.path().join("logs.jsonl"));
        journal.append(create_test_entry(1, 4)).unwrap();

        assert!(matches!(
            journal.append(create_test_entry(1, 4)),
            Err(Error::AlreadyLogged { exercise: ExerciseId(1), .. })
        ));
        journal.append(create_test_entry(2, 4)).unwrap();
        journal.append(create_test_entry(1, 5)).unwrap();
        assert_eq!(journal.read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_replace_keeps_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = LogJournal::new(temp_dir.path().join("logs.jsonl"));
        journal.append(create_test_entry(1, 1)).unwrap();

        let imported = vec![create_test_entry(7, 9).with_id(LogId(40))];
        journal.replace(&imported).unwrap();

        assert_eq!(journal.read_all().unwrap(), imported);
        let next = journal.append(create_test_entry(7, 10)).unwrap();
        assert_eq!(next.id, LogId(41));
    }
}
