//! Key-value persistence backends
//!
//! All persisted state (cache entries, the quota timestamp and the last manual
//! refresh) lives in a single `KeyValueStore`, separated by key prefix. Wiping
//! the store with `clear()` resets every category at once.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::warn;

/// Prefix shared by every cached result set
pub const CACHE_PREFIX: &str = "cache:";

/// Key holding the instant the provider last reported quota exhaustion
pub const QUOTA_KEY: &str = "quota:exceeded_at";

/// Key holding the instant of the last manual refresh
pub const REFRESH_KEY: &str = "refresh:last_at";

/// Errors raised by storage backends
///
/// Callers inside this crate never propagate these to consumers; they are
/// logged and treated as a miss.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded
    #[error("Failed to serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A writer panicked while holding the in-memory map
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// String key-value storage with prefix enumeration
pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns the value for `key`, or `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Inserts or replaces the value for `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; removing an absent key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every stored key starting with `prefix`, in ascending order
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Removes every key owned by this store
    fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local store backed by an ordered map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()?
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Store that keeps one file per key on disk
///
/// Files live in an XDG-compliant cache directory (`~/.cache/wellfeed/` on
/// Linux). Each file is named after the hex encoding of its key, which keeps
/// arbitrary keys filesystem safe and lets `keys()` recover them.
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Directory where entry files are stored
    dir: PathBuf,
}

impl DiskStore {
    /// Creates a DiskStore in the platform cache directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "wellfeed")?;
        Some(Self {
            dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a DiskStore rooted at a custom directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(key)))
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Decodes a file name back into its key, if it belongs to this store
    fn key_from_file_name(name: &str) -> Option<String> {
        let stem = name.strip_suffix(".json")?;
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn stored_keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = entries
            .flatten()
            .filter_map(|entry| Self::key_from_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_dir()?;
        fs::write(self.entry_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .stored_keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        for key in self.stored_keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}

/// Reads an RFC 3339 timestamp, discarding values that do not parse
pub(crate) fn read_timestamp(store: &dyn KeyValueStore, key: &str) -> Option<DateTime<Utc>> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key, error = %e, "failed to read timestamp");
            return None;
        }
    };

    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(_) => {
            warn!(key, "discarding unparsable timestamp");
            remove_key(store, key);
            None
        }
    }
}

/// Stores a timestamp as RFC 3339; failures are logged and dropped
pub(crate) fn write_timestamp(store: &dyn KeyValueStore, key: &str, at: DateTime<Utc>) {
    if let Err(e) = store.set(key, &at.to_rfc3339()) {
        warn!(key, error = %e, "failed to persist timestamp");
    }
}

/// Removes a key; failures are logged and dropped
pub(crate) fn remove_key(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        warn!(key, error = %e, "failed to remove stored key");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_store() -> (DiskStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = DiskStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
        // Removing twice is fine
        store.remove("a").unwrap();
    }

    #[test]
    fn test_memory_store_keys_filters_by_prefix() {
        let store = MemoryStore::new();
        store.set("cache:b", "x").unwrap();
        store.set("cache:a", "x").unwrap();
        store.set(QUOTA_KEY, "x").unwrap();

        assert_eq!(store.keys(CACHE_PREFIX).unwrap(), vec!["cache:a", "cache:b"]);
    }

    #[test]
    fn test_disk_store_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("store");
        let store = DiskStore::with_dir(nested_path.clone());

        store.set("cache:op:abc", "{}").expect("Write should succeed");

        assert!(nested_path.exists(), "Nested directory should be created");
        assert_eq!(store.get("cache:op:abc").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_disk_store_missing_key_and_missing_dir() {
        let (store, temp_dir) = create_test_store();
        assert!(store.get("nope").unwrap().is_none());

        let absent = DiskStore::with_dir(temp_dir.path().join("never-created"));
        assert!(absent.keys("").unwrap().is_empty());
        absent.clear().expect("Clearing a missing directory should succeed");
    }

    #[test]
    fn test_disk_store_keys_roundtrip_through_file_names() {
        let (store, _temp_dir) = create_test_store();
        store.set("cache:fetch_content:00ff", "[]").unwrap();
        store.set("refresh:last_at", "x").unwrap();

        assert_eq!(
            store.keys(CACHE_PREFIX).unwrap(),
            vec!["cache:fetch_content:00ff".to_string()]
        );
        assert_eq!(store.keys("").unwrap().len(), 2);
    }

    #[test]
    fn test_disk_store_clear_leaves_foreign_files() {
        let (store, temp_dir) = create_test_store();
        store.set(QUOTA_KEY, "x").unwrap();
        store.set("cache:a", "x").unwrap();
        let foreign = temp_dir.path().join("notes.txt");
        fs::write(&foreign, "keep me").unwrap();

        store.clear().unwrap();

        assert!(store.keys("").unwrap().is_empty());
        assert!(foreign.exists(), "Files not written by the store must survive");
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = DiskStore::new() {
            let path_str = store.dir().to_string_lossy();
            assert!(path_str.contains("wellfeed"), "Store path should contain project name");
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }

    #[test]
    fn test_timestamp_helpers_roundtrip_and_discard_garbage() {
        let store = MemoryStore::new();
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 8, 30, 0).unwrap();

        write_timestamp(&store, QUOTA_KEY, at);
        assert_eq!(read_timestamp(&store, QUOTA_KEY), Some(at));

        store.set(REFRESH_KEY, "yesterday-ish").unwrap();
        assert_eq!(read_timestamp(&store, REFRESH_KEY), None);
        assert!(store.get(REFRESH_KEY).unwrap().is_none(), "Garbage should be removed");
    }
}
