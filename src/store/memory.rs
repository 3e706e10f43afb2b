//! # In-memory store backend.
//!
//! [`MemoryStore`] keeps records in a process-local map. Nothing survives
//! a restart; it exists for tests and for ephemeral timers that do not
//! need durability.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::record::TimerRecord;
use crate::store::Store;

/// Map-backed store with no durability.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<u64, TimerRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_timers(&self) -> Result<Vec<TimerRecord>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn add_timer(&self, record: &TimerRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists);
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_timer(&self, id: u64) -> Result<TimerRecord, StoreError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_timer(&self, record: &TimerRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn remove_timer(&self, id: u64) -> Result<(), StoreError> {
        self.records.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::Status;

    #[tokio::test]
    async fn contract_roundtrip() {
        let store = MemoryStore::new();
        let mut rec = TimerRecord::new(1, 1);

        store.add_timer(&rec).await.unwrap();
        assert!(matches!(
            store.add_timer(&rec).await,
            Err(StoreError::AlreadyExists)
        ));
        assert_eq!(store.get_timer(1).await.unwrap(), rec);
        assert_eq!(store.list_timers().await.unwrap().len(), 1);

        rec.status = Status::Running;
        store.update_timer(&rec).await.unwrap();
        assert_eq!(store.get_timer(1).await.unwrap().status, Status::Running);

        store.remove_timer(1).await.unwrap();
        store.remove_timer(1).await.unwrap();
        assert!(matches!(
            store.get_timer(1).await,
            Err(StoreError::NotFound)
        ));
    }
}
