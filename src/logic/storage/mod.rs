//! Local Storage - Namespaced, JSON-encoded key/value persistence
//!
//! Every key is stored under the `pm:` prefix in one JSON object file. Reads
//! never fail: a missing or corrupt file, or a value of the wrong shape, falls
//! back to the caller's default. Writes are best-effort: when the file cannot
//! be written the value is kept in memory for the rest of the session.

pub mod settings;

pub use settings::{Settings, SettingsStore};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{STORAGE_FILE_NAME, STORAGE_PREFIX};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/value store backed by a single JSON file (or memory only).
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
}

impl LocalStore {
    /// Open the store file inside `dir`, loading whatever is readable
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(STORAGE_FILE_NAME);
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                if path.exists() {
                    log::warn!("Local storage at {} unreadable, starting empty: {}", path.display(), e);
                }
                Map::new()
            }
        };

        log::info!("Local storage opened: {} ({} keys)", path.display(), entries.len());

        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Session-only store; nothing survives the process
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Map::new()),
        }
    }

    /// Read `key`, or `fallback` when absent or not decodable as `T`
    pub fn get_setting<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let entries = self.entries.lock();
        match entries.get(&namespaced(key)) {
            Some(raw) => serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                log::warn!("Stored value for '{}' is corrupt, using default: {}", key, e);
                fallback
            }),
            None => fallback,
        }
    }

    /// Store `value` under `key`; persistence failures are logged, not returned
    pub fn set_setting<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Cannot encode value for '{}': {}", key, e);
                return;
            }
        };

        let mut entries = self.entries.lock();
        entries.insert(namespaced(key), encoded);
        self.persist(&entries);
    }

    pub fn remove_setting(&self, key: &str) {
        let mut entries = self.entries.lock();
        if entries.remove(&namespaced(key)).is_some() {
            self.persist(&entries);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(&namespaced(key))
    }

    // Called with the entries lock held so writes land in mutation order
    fn persist(&self, entries: &Map<String, Value>) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(e) = save_entries(path, entries) {
            log::warn!("Local storage write failed, keeping value in memory only: {}", e);
        }
    }
}

fn namespaced(key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, key)
}

fn load_entries(path: &Path) -> Result<Map<String, Value>, StorageError> {
    let data = fs::read(path)?;
    let entries: Map<String, Value> = serde_json::from_slice(&data)?;
    Ok(entries)
}

fn save_entries(path: &Path, entries: &Map<String, Value>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(entries)?;
    // Write-then-rename: readers see the old file or the new one, never a partial one
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_bool_number_string() {
        let store = LocalStore::in_memory();
        store.set_setting("autoRefresh", &false);
        store.set_setting("alertThreshold", &85.5);
        store.set_setting("apiBase", "http://scoring:5000");

        assert!(!store.get_setting("autoRefresh", true));
        assert_eq!(store.get_setting("alertThreshold", 70.0), 85.5);
        assert_eq!(store.get_setting("apiBase", String::new()), "http://scoring:5000");
    }

    #[test]
    fn test_missing_key_returns_default() {
        let store = LocalStore::in_memory();
        assert_eq!(store.get_setting("nope", 42), 42);
        assert_eq!(store.get_setting("nope", "fallback".to_string()), "fallback");
    }

    #[test]
    fn test_wrong_shape_returns_default() {
        let store = LocalStore::in_memory();
        store.set_setting("alertThreshold", "not a number");
        assert_eq!(store.get_setting("alertThreshold", 70.0), 70.0);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = LocalStore::open(dir.path());
            store.set_setting("darkTheme", &false);
        }

        let reopened = LocalStore::open(dir.path());
        assert!(!reopened.get_setting("darkTheme", true));

        // Keys are namespaced on disk
        let raw = fs::read_to_string(dir.path().join(STORAGE_FILE_NAME)).unwrap();
        assert!(raw.contains("\"pm:darkTheme\""));
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STORAGE_FILE_NAME), "{ this is not json").unwrap();

        let store = LocalStore::open(dir.path());
        assert!(store.get_setting("autoRefresh", true));

        // Next write replaces the corrupt file
        store.set_setting("autoRefresh", &false);
        let reopened = LocalStore::open(dir.path());
        assert!(!reopened.get_setting("autoRefresh", true));
    }

    #[test]
    fn test_write_failure_keeps_memory_value() {
        let dir = tempdir().unwrap();
        // A file where the data directory should be makes every write fail
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "").unwrap();

        let store = LocalStore::open(&blocker);
        store.set_setting("alertThreshold", &90);
        assert_eq!(store.get_setting("alertThreshold", 70), 90);
    }

    #[test]
    fn test_remove_setting() {
        let store = LocalStore::in_memory();
        store.set_setting("apiBase", "x");
        assert!(store.contains("apiBase"));
        store.remove_setting("apiBase");
        assert!(!store.contains("apiBase"));
        assert_eq!(store.get_setting("apiBase", "d".to_string()), "d");
    }
}
