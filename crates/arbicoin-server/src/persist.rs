//! Background persistence for player saves.
//!
//! Sessions live inside `DashMap` shards and are driven from async tasks, so
//! they never touch the disk themselves. Their engines write into a
//! `QueuedStorage`, which records the latest snapshot per slot and hands it to
//! a single writer task. The writer batches whatever is queued and performs
//! the file writes on tokio's blocking pool.

use arbicoin_core::{FileStorage, Storage, StorageError};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One snapshot waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub key: String,
    pub json: String,
}

/// Storage that reads from disk and queues writes for the writer task.
///
/// Snapshots still in the queue are served from memory, so a player who
/// leaves and rejoins before the write lands sees their latest progress.
#[derive(Debug, Clone)]
pub struct QueuedStorage {
    files: FileStorage,
    pending: Arc<DashMap<String, String>>,
    tx: mpsc::UnboundedSender<SaveRequest>,
}

/// Create the storage handle and the receiver its writer task consumes
pub fn save_queue(
    save_dir: impl Into<PathBuf>,
) -> (QueuedStorage, mpsc::UnboundedReceiver<SaveRequest>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let storage = QueuedStorage {
        files: FileStorage::new(save_dir),
        pending: Arc::new(DashMap::new()),
        tx,
    };
    (storage, rx)
}

impl QueuedStorage {
    /// Number of slots with a write still in flight
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Writer for this queue's directory and pending table
    pub fn writer(&self) -> SaveWriter {
        SaveWriter {
            files: self.files.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl Storage for QueuedStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        if let Some(json) = self.pending.get(key) {
            return Ok(Some(json.value().clone()));
        }
        self.files.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !FileStorage::is_valid_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        self.pending.insert(key.to_string(), value.to_string());
        let request = SaveRequest {
            key: key.to_string(),
            json: value.to_string(),
        };
        if self.tx.send(request).is_err() {
            self.pending.remove_if(key, |_, queued| queued.as_str() == value);
            return Err(StorageError::Unavailable("save writer stopped".into()));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Performs the queued file writes
#[derive(Debug, Clone)]
pub struct SaveWriter {
    files: FileStorage,
    pending: Arc<DashMap<String, String>>,
}

impl SaveWriter {
    /// Write one batch synchronously; returns how many slots were written.
    ///
    /// A slot leaves the pending table only if no newer snapshot was queued
    /// while it was being written. Failed writes stay pending, so the
    /// running server keeps serving them and the next save retries.
    pub fn write_batch(&mut self, batch: BTreeMap<String, String>) -> usize {
        let mut written = 0;
        for (key, json) in batch {
            match self.files.set_item(&key, &json) {
                Ok(()) => {
                    written += 1;
                    self.pending.remove_if(&key, |_, queued| *queued == json);
                }
                Err(e) => warn!(slot = %key, error = %e, "failed to write save"),
            }
        }
        written
    }

    /// Drain the queue until every `QueuedStorage` handle is dropped.
    ///
    /// Requests that pile up while a batch is being written are coalesced,
    /// keeping only the newest snapshot per slot.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<SaveRequest>) {
        while let Some(first) = rx.recv().await {
            let mut batch = BTreeMap::new();
            batch.insert(first.key, first.json);
            while let Ok(next) = rx.try_recv() {
                batch.insert(next.key, next.json);
            }

            let mut writer = self.clone();
            match tokio::task::spawn_blocking(move || writer.write_batch(batch)).await {
                Ok(written) => debug!(written, "saves flushed"),
                Err(e) => warn!(error = %e, "save writer task failed"),
            }
        }
        debug!("save queue closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbicoin_core::{GameEngine, SaveSlot};
    use tempfile::TempDir;

    #[test]
    fn test_set_item_does_not_touch_disk() {
        let tmp = TempDir::new().unwrap();
        let (mut storage, mut rx) = save_queue(tmp.path());

        storage.set_item("alice", r#"{"coins":1}"#).unwrap();

        assert!(!tmp.path().join("alice.json").exists());
        assert_eq!(storage.pending_len(), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            SaveRequest {
                key: "alice".into(),
                json: r#"{"coins":1}"#.into(),
            }
        );
    }

    #[test]
    fn test_pending_save_is_readable_before_write() {
        let tmp = TempDir::new().unwrap();
        let (storage, _rx) = save_queue(tmp.path());

        let mut engine = GameEngine::open(SaveSlot::new(storage.clone(), "bob"));
        for _ in 0..3 {
            engine.tap().unwrap();
        }

        let resumed = GameEngine::open(SaveSlot::new(storage, "bob"));
        assert_eq!(resumed.state().coins, 3);
    }

    #[test]
    fn test_write_batch_clears_only_written_snapshots() {
        let tmp = TempDir::new().unwrap();
        let (mut storage, _rx) = save_queue(tmp.path());
        let mut writer = storage.writer();

        storage.set_item("carol", r#"{"coins":1}"#).unwrap();
        storage.set_item("carol", r#"{"coins":2}"#).unwrap();

        // An older snapshot lands on disk; the newer one stays pending
        let batch = BTreeMap::from([("carol".to_string(), r#"{"coins":1}"#.to_string())]);
        assert_eq!(writer.write_batch(batch), 1);
        assert_eq!(storage.pending_len(), 1);
        assert_eq!(
            storage.get_item("carol").unwrap().as_deref(),
            Some(r#"{"coins":2}"#)
        );

        let batch = BTreeMap::from([("carol".to_string(), r#"{"coins":2}"#.to_string())]);
        assert_eq!(writer.write_batch(batch), 1);
        assert_eq!(storage.pending_len(), 0);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("carol.json")).unwrap(),
            r#"{"coins":2}"#
        );
    }

    #[test]
    fn test_invalid_key_rejected_up_front() {
        let tmp = TempDir::new().unwrap();
        let (mut storage, _rx) = save_queue(tmp.path());
        assert!(matches!(
            storage.set_item("../escape", "{}"),
            Err(StorageError::InvalidKey(_))
        ));
        assert_eq!(storage.pending_len(), 0);
    }

    #[test]
    fn test_closed_queue_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let (mut storage, rx) = save_queue(tmp.path());
        drop(rx);

        assert!(!storage.is_available());
        assert!(matches!(
            storage.set_item("dave", "{}"),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(storage.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_writer_flushes_and_stops_when_handles_drop() {
        let tmp = TempDir::new().unwrap();
        let (storage, rx) = save_queue(tmp.path());
        let writer = tokio::spawn(storage.writer().run(rx));

        let mut engine = GameEngine::open(SaveSlot::new(storage.clone(), "erin"));
        for _ in 0..5 {
            engine.tap().unwrap();
        }
        drop(engine);
        drop(storage);

        writer.await.unwrap();
        let saved = std::fs::read_to_string(tmp.path().join("erin.json")).unwrap();
        assert!(saved.contains("\"coins\":5"));
    }
}
