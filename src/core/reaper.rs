//! # Completion queue and the reaper task.
//!
//! Every terminating timer pushes a [`Completion`] onto a **bounded**
//! queue; a single reaper task drains it and evicts the id from the
//! registry. The bound keeps a burst of simultaneous completions from
//! blocking indefinitely on an unread channel — a completing actor waits
//! for queue space at worst, never forever.
//!
//! Store cleanup is **not** the reaper's job: the actor removes its own
//! record on completion and cancellation before signalling here.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind};

use super::registry::Registry;

/// Why a timer left the running set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Reached zero naturally.
    Completed,
    /// Explicitly cancelled.
    Cancelled,
    /// Stopped by an unrecoverable mid-countdown error.
    Failed,
}

/// Terminal notification from one timer actor.
#[derive(Clone, Copy, Debug)]
pub struct Completion {
    /// Id of the finished timer.
    pub id: u64,
    /// How it finished.
    pub outcome: Outcome,
}

/// Drains the completion queue into registry evictions.
///
/// Runs until the service's runtime token cancels or every sender is
/// gone. Eviction is idempotent — a cancelled timer is usually already
/// out of the registry by the time its completion arrives.
pub(crate) async fn reap(
    registry: Arc<Registry>,
    mut completions: mpsc::Receiver<Completion>,
    bus: Bus,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            done = completions.recv() => {
                let Some(done) = done else { break };
                registry.remove(done.id).await;
                bus.publish(Event::new(EventKind::TimerRemoved).with_timer(done.id));
            }
        }
    }
}
