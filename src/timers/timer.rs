//! # Timer: public handle over one countdown actor.
//!
//! [`Timer::spawn`] launches the actor task and returns the handle. All
//! transitions go through the actor as [`Command`] messages carrying a
//! oneshot ack, so callers get the transition's store result back without
//! any cross-task lock on the status field.
//!
//! ## Output stream
//! The output channel belongs to the handle, not to any particular run of
//! the countdown: pausing and resuming never invalidates an attached
//! consumer. Capacity is 1 — the countdown is consumer-paced and stalls
//! after a single unread value.
//!
//! ## Handle lifetime
//! Dropping every handle closes the command channel. A running actor then
//! finishes its countdown detached; a paused one exits, since nothing can
//! resume it anymore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::{Completion, TimerActor};
use crate::error::{ServiceError, StoreError};
use crate::events::Bus;
use crate::store::{Store, TimerRecord};
use crate::timers::TimerState;

/// Output stream slack: one buffered value, then the countdown waits.
pub(crate) const OUTPUT_CAPACITY: usize = 1;

/// Command channel depth; transitions are rare and ack-paced.
const COMMAND_CAPACITY: usize = 8;

/// Transition request sent into the actor, acked with the store result.
pub(crate) enum Command {
    /// Paused → Running, first start: persist the initial record.
    Start(oneshot::Sender<Result<(), StoreError>>),
    /// Running → Paused.
    Pause(oneshot::Sender<Result<(), StoreError>>),
    /// Paused → Running, continuing from the current remaining time.
    Resume(oneshot::Sender<Result<(), StoreError>>),
    /// Any non-terminal state → Cancelled; removes the persisted record.
    Cancel(oneshot::Sender<Result<(), StoreError>>),
}

/// Everything a timer actor needs besides its record and the store.
pub struct TimerParams {
    /// Duration of one time unit.
    pub tick: Duration,
    /// Bus for lifecycle events.
    pub bus: Bus,
    /// Completion queue of the owning service; `None` for standalone timers.
    pub completions: Option<mpsc::Sender<Completion>>,
    /// Cooperative shutdown token (a child of the service runtime token,
    /// or a fresh token for standalone timers).
    pub token: CancellationToken,
}

/// Handle to one countdown timer.
pub struct Timer {
    id: u64,
    duration: u64,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<TimerState>,
    output: Mutex<Option<mpsc::Receiver<u64>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
    /// Spawns the countdown actor for `record` and returns its handle.
    ///
    /// The actor starts in the state the record carries: `Paused` ticks
    /// only after [`Timer::start`] or [`Timer::resume`], `Running`
    /// (a restored record) begins ticking immediately.
    pub fn spawn(record: TimerRecord, store: Arc<dyn Store>, params: TimerParams) -> Arc<Self> {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(TimerState {
            status: record.status,
            remaining: record.time_remaining,
        });

        let id = record.id;
        let duration = record.duration;
        let actor = TimerActor::new(record, store, command_rx, output_tx, state_tx, params);
        let task = tokio::spawn(actor.run());

        Arc::new(Self {
            id,
            duration,
            commands: command_tx,
            state: state_rx,
            output: Mutex::new(Some(output_rx)),
            task: Mutex::new(Some(task)),
        })
    }

    /// Unique timer id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Total time units, fixed at creation.
    #[inline]
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Current state snapshot.
    pub fn state(&self) -> TimerState {
        *self.state.borrow()
    }

    /// Current state-machine label.
    pub fn status(&self) -> crate::store::Status {
        self.state().status
    }

    /// Time units left at the last committed tick boundary.
    pub fn remaining(&self) -> u64 {
        self.state().remaining
    }

    /// Watch receiver for awaiting state transitions.
    pub fn state_stream(&self) -> watch::Receiver<TimerState> {
        self.state.clone()
    }

    /// Takes the output stream; only the first caller gets it.
    ///
    /// The stream yields the remaining time at each tick (`D, D-1, …, 1`)
    /// and closes when the timer reaches a terminal state.
    pub async fn take_output(&self) -> Option<mpsc::Receiver<u64>> {
        self.output.lock().await.take()
    }

    /// Starts the countdown: persists the initial record, then ticks.
    ///
    /// Fails with `AlreadyExists` if a record for this id is already
    /// persisted, or with a store failure if the initial persist fails;
    /// the timer keeps its `Paused` state in both cases.
    pub async fn start(&self) -> Result<(), ServiceError> {
        self.request(Command::Start).await
    }

    /// Suspends the countdown; the paused status is persisted.
    ///
    /// A no-op unless the timer is running. Observed by the countdown no
    /// later than the next tick boundary; an unconsumed emit is aborted
    /// and its value re-emitted on resume.
    pub async fn pause(&self) -> Result<(), ServiceError> {
        self.request(Command::Pause).await
    }

    /// Resumes a paused countdown from the current remaining time.
    pub async fn resume(&self) -> Result<(), ServiceError> {
        self.request(Command::Resume).await
    }

    /// Cancels the timer and removes its persisted record.
    ///
    /// Takes effect strictly before the next emit; at most one value that
    /// was already buffered can still be read from the output stream.
    pub async fn cancel(&self) -> Result<(), ServiceError> {
        self.request(Command::Cancel).await
    }

    /// Waits for the actor task to exit.
    pub async fn wait(&self) {
        let mut slot = self.task.lock().await;
        if let Some(handle) = slot.as_mut() {
            let _ = handle.await;
            *slot = None;
        }
    }

    async fn request<F>(&self, command: F) -> Result<(), ServiceError>
    where
        F: FnOnce(oneshot::Sender<Result<(), StoreError>>) -> Command,
    {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(command(ack_tx))
            .await
            .map_err(|_| ServiceError::NotFound)?;
        // A dropped ack means the actor terminated mid-request.
        let result = ack_rx.await.map_err(|_| ServiceError::NotFound)?;
        result.map_err(ServiceError::from)
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("duration", &self.duration)
            .field("state", &self.state())
            .finish()
    }
}
