//! Persistent key-value storage backed by JSON files.
//!
//! Each key maps to one file under the data directory: `<key>.json` for whole
//! documents and `<key>.jsonl` for append-only logs (one JSON value per line).

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BinscanError, Result};

/// Storage key for user-registered QR codes.
pub const USER_CODES_KEY: &str = "userCodes";

/// Storage key for the scan history log.
pub const SCAN_HISTORY_KEY: &str = "scanHistory";

/// Storage key for bins dropped on the map.
pub const DROPPED_PINS_KEY: &str = "droppedPins";

/// Storage backend for binscan data.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a storage instance rooted at `data_dir`.
    #[must_use]
    pub const fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Storage at the platform default location (see [`default_data_dir`]).
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined.
    pub fn default_location() -> Result<Self> {
        default_data_dir().map(Self::new)
    }

    /// Root directory of this store.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the document stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.document_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content).map_err(|e| {
            BinscanError::PersistenceError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(Some(value))
    }

    /// Replace the document stored under `key`.
    ///
    /// Writes to a temporary file first and renames it into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.document_path(key);
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(key, path = %path.display(), "Saved document");
        Ok(())
    }

    /// Append one entry to the log stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be opened or written.
    pub fn append<T: Serialize>(&self, key: &str, entry: &T) -> Result<()> {
        self.ensure_dir()?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(key))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Read every entry of the log stored under `key`, oldest first.
    ///
    /// Lines that fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be read.
    pub fn read_log<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let path = self.log_path(key);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(std::fs::File::open(&path)?);
        let mut entries = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    key,
                    line = index + 1,
                    error = %e,
                    "Skipping unreadable log entry"
                ),
            }
        }
        Ok(entries)
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            BinscanError::PersistenceError(format!(
                "Failed to create directory {}: {e}",
                self.data_dir.display()
            ))
        })
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    fn log_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.jsonl"))
    }
}

/// Default data directory.
///
/// On Linux servers: `/var/lib/binscan`
/// Elsewhere: the platform data dir, e.g. `~/Library/Application Support/binscan`
///
/// # Errors
///
/// Returns an error if the platform data directory cannot be determined.
pub fn default_data_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/var/lib/binscan"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "binscan")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| BinscanError::PersistenceError("Cannot determine data directory".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        n: u32,
    }

    fn temp_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("nested"));
        (dir, storage)
    }

    #[test]
    fn test_missing_key_loads_none() {
        let (_dir, storage) = temp_storage();
        let loaded: Option<Vec<String>> = storage.load("nothing").unwrap();
        assert!(loaded.is_none());
        let log: Vec<Entry> = storage.read_log("nothing").unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, storage) = temp_storage();
        storage.save("doc", &vec!["a", "b"]).unwrap();
        let loaded: Vec<String> = storage.load("doc").unwrap().unwrap();
        assert_eq!(loaded, vec!["a", "b"]);

        storage.save("doc", &vec!["c"]).unwrap();
        let loaded: Vec<String> = storage.load("doc").unwrap().unwrap();
        assert_eq!(loaded, vec!["c"]);
    }

    #[test]
    fn test_corrupt_document_is_persistence_error() {
        let (_dir, storage) = temp_storage();
        std::fs::create_dir_all(storage.data_dir()).unwrap();
        std::fs::write(storage.data_dir().join("doc.json"), "{not json").unwrap();
        let err = storage.load::<Vec<String>>("doc").unwrap_err();
        assert!(matches!(err, BinscanError::PersistenceError(_)));
    }

    #[test]
    fn test_log_appends_in_order_and_skips_bad_lines() {
        let (_dir, storage) = temp_storage();
        storage.append("log", &Entry { n: 1 }).unwrap();
        storage.append("log", &Entry { n: 2 }).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(storage.data_dir().join("log.jsonl"))
            .unwrap();
        writeln!(file, "garbage").unwrap();
        storage.append("log", &Entry { n: 3 }).unwrap();

        let entries: Vec<Entry> = storage.read_log("log").unwrap();
        assert_eq!(entries, vec![Entry { n: 1 }, Entry { n: 2 }, Entry { n: 3 }]);
    }

    #[test]
    fn test_default_data_dir_is_valid_path() {
        let dir = default_data_dir().unwrap();
        assert!(!dir.as_os_str().is_empty());
    }
}
