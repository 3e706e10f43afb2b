//! Externally observable timer state, published through a watch channel.

use crate::store::Status;

/// Snapshot of a timer's state at some tick boundary.
///
/// Published by the actor after every transition and every committed tick;
/// read through [`Timer::state`](crate::Timer::state) or awaited through
/// [`Timer::state_stream`](crate::Timer::state_stream).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerState {
    /// Current state-machine label.
    pub status: Status,
    /// Time units left; `duration` until the first tick commits.
    pub remaining: u64,
}

impl TimerState {
    /// True once the timer can no longer change state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
