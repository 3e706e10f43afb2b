//! Error types used by the countdown service and its persistence layer.
//!
//! This module defines two main error enums:
//!
//! - [`ServiceError`] — errors surfaced by timer and service operations.
//! - [`StoreError`] — errors raised by the persistence backend.
//!
//! Both types provide an `as_label` helper producing a short stable
//! snake_case identifier for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors surfaced by service and timer operations.
///
/// The `NotFound` and `AlreadyExists` variants render the exact strings
/// callers match on (`"Timer not found"`, `"Timer already exists"`).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The referenced id is absent from the registry and the store.
    #[error("Timer not found")]
    NotFound,

    /// Creation collided with an id that is already live or persisted.
    #[error("Timer already exists")]
    AlreadyExists,

    /// The persistence backend failed while handling the operation.
    #[error("store failure: {0}")]
    Store(#[source] StoreError),

    /// Shutdown grace period was exceeded; some timers remained stuck.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of the timers that did not stop in time.
        stuck: Vec<u64>,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::NotFound => "timer_not_found",
            ServiceError::AlreadyExists => "timer_already_exists",
            ServiceError::Store(_) => "store_failure",
            ServiceError::GraceExceeded { .. } => "grace_exceeded",
        }
    }
}

impl From<StoreError> for ServiceError {
    /// Lifts a store error into the caller-facing taxonomy.
    ///
    /// `NotFound`/`AlreadyExists` keep their identity across the layers so
    /// callers see one error for "no such timer" regardless of whether the
    /// registry or the store answered.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::AlreadyExists => ServiceError::AlreadyExists,
            other => ServiceError::Store(other),
        }
    }
}

/// # Errors produced by the persistence layer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record stored under the requested id.
    #[error("Timer not found")]
    NotFound,

    /// A record already exists under the id being added.
    #[error("Timer already exists")]
    AlreadyExists,

    /// The storage engine failed (I/O, corruption, lock contention).
    #[error("storage engine error: {0}")]
    Backend(#[from] sled::Error),

    /// A record could not be encoded or decoded.
    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::NotFound => "record_not_found",
            StoreError::AlreadyExists => "record_already_exists",
            StoreError::Backend(_) => "store_backend",
            StoreError::Codec(_) => "store_codec",
        }
    }
}
