//! Durable key-value storage for caching and favorites.
//!
//! The synchronizer and the favorites registry both persist JSON blobs under
//! namespaced string keys. The `KeyValueStore` trait keeps them independent
//! of where the blobs live; `FileStore` is the production implementation,
//! one file per key under the platform cache directory.
//!
//! Storage failures are never fatal: callers log them and carry on as if the
//! key were absent (read) or the write had not happened.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scoped durable string storage.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if it has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// File-backed store: each key becomes `<dir>/<key>.json`.
///
/// Keys are namespaced identifiers (`PlatzPilot_...`) and contain only
/// filename-safe characters.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Open the store in the platform cache directory for this app.
    pub fn open_default(config: &Config) -> anyhow::Result<Self> {
        let dir = config.cache_dir()?;
        Ok(Self::new(dir)?)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.get("PlatzPilot_Nothing").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("PlatzPilot_Favorites", "[]").unwrap();
        assert_eq!(store.get("PlatzPilot_Favorites").unwrap().as_deref(), Some("[]"));

        // Writes replace, not append
        store.set("PlatzPilot_Favorites", r#"[{"x":1}]"#).unwrap();
        assert_eq!(
            store.get("PlatzPilot_Favorites").unwrap().as_deref(),
            Some(r#"[{"x":1}]"#)
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("PlatzPilot_LibraryData", "{}").unwrap();
        store.set("PlatzPilot_LibraryData_Expiry", "12345").unwrap();

        assert_eq!(store.get("PlatzPilot_LibraryData").unwrap().as_deref(), Some("{}"));
        assert_eq!(
            store.get("PlatzPilot_LibraryData_Expiry").unwrap().as_deref(),
            Some("12345")
        );
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(nested).unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
