// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Failures of reading or writing cache files.
///
/// Never returned by the read or write methods of a [CacheManager](super::CacheManager),
/// which only log them.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage of named text snapshots.
pub trait SnapshotStorage: Debug + Send + Sync {
    /// Returns the contents of a snapshot, or `None` if it was never saved.
    fn load(&self, name: &str) -> Result<Option<String>, PersistError>;

    /// Creates or replaces a snapshot.
    fn save(&self, name: &str, contents: &str) -> Result<(), PersistError>;

    /// Removes all snapshots.
    fn clear(&self) -> Result<(), PersistError>;
}

/// [SnapshotStorage] keeping every snapshot in a `{prefix}{name}.json` file
/// in a directory. The directory is created on first save.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    prefix: String,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(dir: P, prefix: S) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", self.prefix, name))
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self, name: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path(name)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, name: &str, contents: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;

        // Replace atomically
        let path = self.path(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let is_snapshot = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&self.prefix));
            if is_snapshot && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }

        Ok(())
    }
}

/// [SnapshotStorage] keeping snapshots in memory, for the lifetime of the object.
#[derive(Debug, Default)]
pub struct MemoryStorage(Mutex<BTreeMap<String, String>>);

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names of all saved snapshots.
    pub fn names(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, name: &str) -> Result<Option<String>, PersistError> {
        let snapshots = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(snapshots.get(name).cloned())
    }

    fn save(&self, name: &str, contents: &str) -> Result<(), PersistError> {
        let mut snapshots = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        snapshots.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("cache"), "test_");

        assert_eq!(storage.load("geocoding").unwrap(), None);
        storage.save("geocoding", "[]").unwrap();
        storage.save("geocoding", "[1]").unwrap();
        assert_eq!(storage.load("geocoding").unwrap().as_deref(), Some("[1]"));
        assert!(dir.path().join("cache/test_geocoding.json").is_file());

        fs::write(dir.path().join("cache/unrelated.txt"), "keep me").unwrap();
        storage.clear().unwrap();
        assert_eq!(storage.load("geocoding").unwrap(), None);
        assert!(dir.path().join("cache/unrelated.txt").is_file());
    }

    #[test]
    fn file_storage_clear_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("missing"), "test_");
        storage.clear().unwrap();
    }

    #[test]
    fn memory_storage() {
        let storage = MemoryStorage::new();
        storage.save("a", "1").unwrap();
        storage.save("b", "2").unwrap();
        assert_eq!(storage.load("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.names(), vec!["a".to_string(), "b".to_string()]);

        storage.clear().unwrap();
        assert!(storage.names().is_empty());
    }
}
