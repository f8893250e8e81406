//! Durable key-value storage for the cart.
//!
//! The cart is written as one opaque JSON payload under a fixed key. There is no
//! version field and no expiry.

use crate::errors::{Error, Result};
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Somewhere a serialized cart can live between runs.
pub trait CartStorage: Send + Sync {
    /// Returns the payload stored under `key`, or `None` if nothing was saved yet.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the payload stored under `key`.
    fn save(&self, key: &str, payload: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    dir: PathBuf,
}

impl FileCartStorage {
    /// Storage rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Directory the cart files are written to
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl CartStorage for FileCartStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, payload: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, payload)?;
        debug!(path = %path.display(), bytes = payload.len(), "Cart persisted");
        Ok(())
    }
}

/// Process-local storage. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCartStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::Storage(io::Error::other("cart storage lock poisoned"))
}

impl CartStorage for MemoryCartStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().map_err(|_| poisoned())?;
        Ok(slots.get(key).cloned())
    }

    fn save(&self, key: &str, payload: &str) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| poisoned())?;
        slots.insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_file_storage_missing_key_is_none() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileCartStorage::new(dir.path());
        assert_eq!(storage.load("cart")?, None);
        Ok(())
    }

    #[test]
    fn test_file_storage_creates_directory_and_overwrites() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileCartStorage::new(dir.path().join("nested"));

        storage.save("cart", r#"{"items":[]}"#)?;
        storage.save("cart", r#"{"items":[1]}"#)?;

        assert_eq!(storage.load("cart")?.unwrap(), r#"{"items":[1]}"#);
        assert!(storage.dir().join("cart.json").exists());
        Ok(())
    }

    #[test]
    fn test_memory_storage_clones_share_slots() -> Result<()> {
        let storage = MemoryCartStorage::new();
        let other = storage.clone();
        storage.save("cart", "payload")?;
        assert_eq!(other.load("cart")?.as_deref(), Some("payload"));
        assert_eq!(other.load("other")?, None);
        Ok(())
    }
}
