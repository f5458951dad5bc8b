//! Whole-collection JSON snapshots with file locking.
//!
//! Exercises, settings and daily notes are small collections that are
//! rewritten in full on every change, atomically, so a reader never sees
//! a half-written file.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Load a collection with a shared lock.
///
/// A missing file is an empty collection. An unreadable file is an error:
/// replacing it with an empty collection would lose data on the next save.
pub fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&contents).map_err(|e| {
        tracing::warn!("Failed to parse collection {:?}: {}", path, e);
        Error::Store(format!("corrupt collection {}: {}", path.display(), e))
    })
}

/// A file written next to its destination but not yet moved into place.
///
/// Dropping it without [`StagedFile::commit`] deletes the temp file.
pub struct StagedFile {
    temp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    /// Write and sync a temp file in the destination's directory
    pub fn write<F>(path: &Path, write: F) -> Result<Self>
    where
        F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
    {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("{} has no parent directory", path.display())))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            write(&mut writer)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        Ok(Self {
            temp,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename over the destination
    pub fn commit(self) -> Result<()> {
        self.temp
            .persist(&self.path)
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

/// Stage a collection for an atomic save
pub fn stage_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<StagedFile> {
    StagedFile::write(path, |writer| Ok(serde_json::to_writer(writer, items)?))
}

/// Save a collection atomically
///
/// 1. Write to a temp file in the same directory
/// 2. Sync to disk
/// 3. Rename over the existing file
pub fn save_collection<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    stage_collection(path, items)?.commit()?;
    tracing::debug!("Saved {} records to {:?}", items.len(), path);
    Ok(())
}

/// Load a collection, modify it, and save it back
pub fn update_collection<T, R, F>(path: &Path, f: F) -> Result<R>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&mut Vec<T>) -> Result<R>,
{
    let mut items = load_collection(path)?;
    let result = f(&mut items)?;
    save_collection(path, &items)?;
    Ok(result)
}
