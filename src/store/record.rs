//! # Persisted timer record and status.
//!
//! [`TimerRecord`] is the store's view of a timer: everything needed to
//! reconstruct it after a restart. [`Status`] doubles as the in-memory
//! state-machine label; only the two resumable states (`Paused`,
//! `Running`) ever reach disk — terminal timers are removed instead.

use serde::{Deserialize, Serialize};

/// Timer state-machine label.
///
/// `Paused` is the initial state. `Cancelled`, `Completed` and `Failed`
/// are terminal and never persisted: a terminal timer's record is removed
/// from the store, and a terminal status found in a stored record marks it
/// stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Countdown suspended; resumable.
    Paused,
    /// Countdown ticking.
    Running,
    /// Explicitly cancelled. Terminal.
    Cancelled,
    /// Reached zero naturally. Terminal.
    Completed,
    /// Stopped by an unrecoverable mid-countdown error. Terminal.
    Failed,
}

impl Status {
    /// True for states the timer can never leave.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Cancelled | Status::Completed | Status::Failed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Paused => "Paused",
            Status::Running => "Running",
            Status::Cancelled => "Cancelled",
            Status::Completed => "Completed",
            Status::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Persisted view of one timer.
///
/// Keyed in the store by [`key`]`(id)`; the value is the self-describing
/// JSON serialization of this struct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Unique id among all live and persisted timers.
    pub id: u64,
    /// Total time units, fixed at creation.
    pub duration: u64,
    /// Units left; within `[0, duration]`, non-increasing while running.
    pub time_remaining: u64,
    /// State-machine label at the last persist.
    pub status: Status,
}

impl TimerRecord {
    /// Record for a freshly created timer: full duration, paused.
    pub fn new(id: u64, duration: u64) -> Self {
        Self {
            id,
            duration,
            time_remaining: duration,
            status: Status::Paused,
        }
    }

    /// Copy of this record carrying a different status.
    pub fn with_status(&self, status: Status) -> Self {
        Self { status, ..*self }
    }
}

/// Fixed-width store key for a timer id: 8-byte little-endian encoding.
#[inline]
pub fn key(id: u64) -> [u8; 8] {
    id.to_le_bytes()
}
