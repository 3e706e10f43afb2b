//! # Durable persistence for timer records.
//!
//! The [`Store`] trait is the narrow seam between the countdown runtime and
//! whatever holds the records; the runtime never sees the engine, only this
//! contract. Two backends ship with the crate:
//!
//! - [`SledStore`] — embedded on-disk engine, the durable default
//! - [`MemoryStore`] — process-local map, for tests and ephemeral use
//!
//! ## Contract
//! - [`Store::add_timer`] is **atomic**: exactly one of two concurrent adds
//!   for the same id succeeds, the other fails `AlreadyExists`. The service
//!   relies on this as the final arbiter for duplicate ids.
//! - [`Store::update_timer`] is an upsert with no existence check.
//! - [`Store::remove_timer`] is idempotent; removing an absent id is Ok.
//! - [`Store::list_timers`] returns records in unspecified order.
//!
//! ## On-disk layout
//! One record per timer under the `"timers"` bucket; key = 8-byte
//! little-endian id ([`key`]), value = self-describing JSON of
//! [`TimerRecord`].

mod memory;
mod record;
mod sled;

use async_trait::async_trait;

use crate::error::StoreError;

pub use self::sled::SledStore;
pub use memory::MemoryStore;
pub use record::{key, Status, TimerRecord};

/// Durable key-value persistence for timer records.
///
/// Implementations must be safe to call from many actors concurrently;
/// each countdown tick performs exactly one [`Store::update_timer`] before
/// sleeping, so write latency paces the timers.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Returns all persisted records, order unspecified.
    async fn list_timers(&self) -> Result<Vec<TimerRecord>, StoreError>;

    /// Persists a new record; fails [`StoreError::AlreadyExists`] if the
    /// id is present. Atomic with respect to concurrent adds.
    async fn add_timer(&self, record: &TimerRecord) -> Result<(), StoreError>;

    /// Fetches the record for `id`; fails [`StoreError::NotFound`] if absent.
    async fn get_timer(&self, id: u64) -> Result<TimerRecord, StoreError>;

    /// Upserts a record, no existence check.
    async fn update_timer(&self, record: &TimerRecord) -> Result<(), StoreError>;

    /// Deletes the record for `id`; absent ids are not an error.
    async fn remove_timer(&self, id: u64) -> Result<(), StoreError>;
}
