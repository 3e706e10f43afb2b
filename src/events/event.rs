//! # Runtime events emitted by the service and timer actors.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Timer lifecycle**: start, tick, pause/resume, terminal transitions
//! - **Registry management**: restore results and reaper evictions
//! - **Service lifecycle**: shutdown progression
//!
//! The [`Event`] struct carries optional metadata such as the timer id,
//! the remaining time at the moment of the event, and a failure reason.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when events are consumed from
//! multiple receivers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Timer lifecycle ===
    /// A timer was created and its initial record persisted.
    ///
    /// Sets: `timer`, `remaining` (= duration).
    TimerStarted,

    /// One countdown tick committed (emit + decrement + persist).
    ///
    /// Sets: `timer`, `remaining` (value after the decrement).
    Tick,

    /// A running timer was paused; its record now carries the paused status.
    ///
    /// Sets: `timer`, `remaining`.
    TimerPaused,

    /// A paused timer resumed ticking from its current remaining time.
    ///
    /// Sets: `timer`, `remaining`.
    TimerResumed,

    /// A timer was cancelled and its record removed.
    ///
    /// Sets: `timer`.
    TimerCancelled,

    /// A timer reached zero; its record was removed and its stream closed.
    ///
    /// Sets: `timer`; `reason` only when record cleanup failed and left a
    /// stale record behind.
    TimerCompleted,

    /// A timer hit an unrecoverable error mid-countdown and stopped.
    ///
    /// Sets: `timer`, `reason`.
    TimerFailed,

    // === Registry management ===
    /// A persisted timer was reconstructed at startup or on lazy lookup.
    ///
    /// Sets: `timer`, `remaining`.
    TimerRestored,

    /// A persisted record could not be restored and was skipped.
    ///
    /// Sets: `timer` (when the id is known), `reason`.
    RestoreFailed,

    /// The reaper evicted a finished timer from the registry.
    ///
    /// Sets: `timer`.
    TimerRemoved,

    // === Service lifecycle ===
    /// Graceful shutdown began.
    ShutdownRequested,

    /// All timer actors stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period elapsed with timer actors still running.
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for rendering)
/// - other fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Timer id, if the event concerns one timer.
    pub timer: Option<u64>,
    /// Remaining time units at the moment of the event.
    pub remaining: Option<u64>,
    /// Human-readable reason (errors, skip details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp
    /// and the next global sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            timer: None,
            remaining: None,
            reason: None,
        }
    }

    /// Attaches a timer id.
    #[inline]
    pub fn with_timer(mut self, id: u64) -> Self {
        self.timer = Some(id);
        self
    }

    /// Attaches the remaining time units.
    #[inline]
    pub fn with_remaining(mut self, remaining: u64) -> Self {
        self.remaining = Some(remaining);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for the three terminal timer events.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TimerCancelled | EventKind::TimerCompleted | EventKind::TimerFailed
        )
    }
}
