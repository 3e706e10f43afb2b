//! # Embedded on-disk store backend.
//!
//! [`SledStore`] keeps timer records in a `sled` tree named `"timers"`,
//! one record per timer under the 8-byte little-endian id key. Every
//! mutation is flushed before returning, so a record that was reported
//! persisted survives a crash — per-tick latency is paced by this flush.
//!
//! Duplicate detection in [`add_timer`](crate::Store::add_timer) rides on
//! the engine's `compare_and_swap`, which makes the add atomic across
//! concurrent callers.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::record::{key, TimerRecord};
use crate::store::Store;

/// Name of the tree (bucket) holding all timer records.
const TIMERS_TREE: &[u8] = b"timers";

/// Durable store backed by an embedded `sled` database.
#[derive(Clone)]
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Opens (or creates) the database at `path` and its `"timers"` tree.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TIMERS_TREE)?;
        Ok(Self { tree })
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SledStore {
    async fn list_timers(&self) -> Result<Vec<TimerRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            // An undecodable value cannot be restored; one bad record must
            // not take the rest of the store down with it.
            if let Ok(record) = serde_json::from_slice(&value) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn add_timer(&self, record: &TimerRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(record)?;
        let swapped = self
            .tree
            .compare_and_swap(key(record.id), None::<&[u8]>, Some(value))?;
        if swapped.is_err() {
            return Err(StoreError::AlreadyExists);
        }
        self.flush().await
    }

    async fn get_timer(&self, id: u64) -> Result<TimerRecord, StoreError> {
        match self.tree.get(key(id))? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Err(StoreError::NotFound),
        }
    }

    async fn update_timer(&self, record: &TimerRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(record)?;
        self.tree.insert(key(record.id), value)?;
        self.flush().await
    }

    async fn remove_timer(&self, id: u64) -> Result<(), StoreError> {
        self.tree.remove(key(id))?;
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::Status;

    fn open_temp() -> (tempfile::TempDir, SledStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path().join("countdown.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn add_get_update_remove_roundtrip() {
        let (_dir, store) = open_temp();
        let mut rec = TimerRecord::new(1, 5);

        store.add_timer(&rec).await.unwrap();
        assert_eq!(store.get_timer(1).await.unwrap(), rec);

        rec.time_remaining = 3;
        rec.status = Status::Running;
        store.update_timer(&rec).await.unwrap();
        assert_eq!(store.get_timer(1).await.unwrap(), rec);

        store.remove_timer(1).await.unwrap();
        assert!(matches!(
            store.get_timer(1).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let (_dir, store) = open_temp();
        let rec = TimerRecord::new(7, 2);
        store.add_timer(&rec).await.unwrap();
        assert!(matches!(
            store.add_timer(&rec).await,
            Err(StoreError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, store) = open_temp();
        store.remove_timer(42).await.unwrap();
        store.remove_timer(42).await.unwrap();
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countdown.db");

        {
            let store = SledStore::open(&path).unwrap();
            store.add_timer(&TimerRecord::new(9, 4)).await.unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        let rec = store.get_timer(9).await.unwrap();
        assert_eq!(rec.duration, 4);
        assert_eq!(store.list_timers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn keys_are_fixed_width_little_endian() {
        let (_dir, store) = open_temp();
        store.add_timer(&TimerRecord::new(258, 1)).await.unwrap();

        // 258 = 0x0102 → [2, 1, 0, 0, 0, 0, 0, 0] on disk
        let raw = store.tree.get([2, 1, 0, 0, 0, 0, 0, 0]).unwrap();
        assert!(raw.is_some());
    }
}
