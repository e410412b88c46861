//! Persistence adapters.
//!
//! A `Storage` is a flat string key/value store (browser `localStorage`, a
//! directory of files, or memory). A `SaveSlot` binds one key of a storage to
//! snapshot encoding. Saving is best-effort: failures are logged and dropped,
//! and anything unreadable on load is treated as "no saved game".

use crate::snapshot::{Snapshot, SnapshotError};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Slot name used by the browser build
pub const DEFAULT_SLOT: &str = "arbiCoinGame";

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid slot key: {0:?}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A string key/value store
pub trait Storage {
    /// Read the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value stored under `key`
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Whether writes can succeed at all
    fn is_available(&self) -> bool {
        true
    }
}

/// In-memory storage, lost when dropped
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Whether `key` can be used as a file name
    pub fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !Self::is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write then rename; readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// A storage that may be missing. Reads see an empty store and writes fail.
impl<S: Storage> Storage for Option<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Some(storage) => storage.get_item(key),
            None => Ok(None),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Some(storage) => storage.set_item(key, value),
            None => Err(StorageError::Unavailable("no backing storage".into())),
        }
    }

    fn is_available(&self) -> bool {
        self.as_ref().map_or(false, |storage| storage.is_available())
    }
}

/// Browser `localStorage`.
///
/// Private browsing modes and sandboxed iframes can deny access. The game
/// still runs then, it just starts fresh and cannot save.
#[cfg(feature = "wasm")]
pub struct LocalStorage {
    inner: Option<WebStorage>,
}

#[cfg(feature = "wasm")]
struct WebStorage(web_sys::Storage);

#[cfg(feature = "wasm")]
impl LocalStorage {
    /// Open the current window's `localStorage`, degrading to no storage
    pub fn open() -> Self {
        match Self::window_storage() {
            Ok(storage) => Self {
                inner: Some(WebStorage(storage)),
            },
            Err(e) => {
                warn!(error = %e, "localStorage unavailable, progress will not be saved");
                Self { inner: None }
            }
        }
    }

    fn window_storage() -> Result<web_sys::Storage, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))
    }
}

#[cfg(feature = "wasm")]
impl Storage for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
    }
}

#[cfg(feature = "wasm")]
impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_item(key, value)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

/// A named slot holding one snapshot
#[derive(Debug, Clone)]
pub struct SaveSlot<S> {
    storage: S,
    key: String,
}

impl<S: Storage> SaveSlot<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether saves to this slot can succeed
    pub fn storage_available(&self) -> bool {
        self.storage.is_available()
    }

    /// Write a snapshot, reporting failures
    pub fn try_save(&mut self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let json = snapshot.to_json()?;
        self.storage.set_item(&self.key, &json)
    }

    /// Write a snapshot; failures are logged and otherwise ignored
    pub fn save(&mut self, snapshot: &Snapshot) {
        if let Err(e) = self.try_save(snapshot) {
            warn!(slot = %self.key, error = %e, "failed to save game");
        }
    }

    /// Read the slot, reporting failures
    pub fn try_load(&self) -> Result<Option<Snapshot>, StorageError> {
        match self.storage.get_item(&self.key)? {
            Some(json) => Ok(Some(Snapshot::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Read the slot; missing, unreadable and corrupt saves all yield `None`
    pub fn load(&self) -> Option<Snapshot> {
        match self.try_load() {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => {
                debug!(slot = %self.key, "no saved game");
                None
            }
            Err(e) => {
                warn!(slot = %self.key, error = %e, "ignoring unreadable save");
                None
            }
        }
    }
}
