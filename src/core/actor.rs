//! # TimerActor: the countdown task.
//!
//! One actor per timer owns the whole state machine: ticking, transition
//! commands, persistence, and terminal cleanup. Nothing else mutates a
//! timer's status or remaining time — external callers only send
//! [`Command`] messages, which the actor serializes with its own ticking.
//!
//! ## Tick
//! ```text
//! while Running and remaining > 0 {
//!   ├─► emit remaining on the output stream   (blocks until consumed;
//!   │                                          commands abort the emit)
//!   ├─► remaining -= 1, publish state
//!   ├─► Store::update_timer(record)           (failure → Failed, exit)
//!   └─► wait one tick unit                    (commands cut the wait)
//! }
//! ```
//!
//! ## Checkpoints
//! Commands and the shutdown token are polled with priority (`biased`)
//! both at the tick boundary and while an emit is blocked, so:
//! - a cancel takes effect strictly before the next emit;
//! - a pause aborts an unconsumed emit, and the same value is re-emitted
//!   on resume — no skipped, no duplicated value;
//! - shutdown never waits on a stalled consumer.
//!
//! ## Terminal paths
//! - `remaining == 0` → Completed: record removed, completion notified.
//! - Cancel → Cancelled: record removed, completion notified.
//! - Persist failure mid-tick → Failed: completion notified so the
//!   registry entry is reaped rather than left orphaned.
//! - Shutdown token → exit with **no** cleanup: the record must survive
//!   for restore.
//!
//! The output stream closes on every terminal path (the sender drops with
//! the actor).

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::events::{Bus, Event, EventKind};
use crate::store::{Status, Store, TimerRecord};
use crate::timers::{Command, TimerParams, TimerState};

use super::reaper::{Completion, Outcome};

/// Drives one timer's countdown and owns all of its state transitions.
pub(crate) struct TimerActor {
    id: u64,
    duration: u64,
    remaining: u64,
    status: Status,
    tick: Duration,
    next_tick: Instant,
    store: Arc<dyn Store>,
    commands: mpsc::Receiver<Command>,
    commands_open: bool,
    output: mpsc::Sender<u64>,
    state_tx: watch::Sender<TimerState>,
    bus: Bus,
    completions: Option<mpsc::Sender<Completion>>,
    token: CancellationToken,
}

impl TimerActor {
    pub(crate) fn new(
        record: TimerRecord,
        store: Arc<dyn Store>,
        commands: mpsc::Receiver<Command>,
        output: mpsc::Sender<u64>,
        state_tx: watch::Sender<TimerState>,
        params: TimerParams,
    ) -> Self {
        Self {
            id: record.id,
            duration: record.duration,
            remaining: record.time_remaining,
            status: record.status,
            tick: params.tick,
            next_tick: Instant::now(),
            store,
            commands,
            commands_open: true,
            output,
            state_tx,
            bus: params.bus,
            completions: params.completions,
            token: params.token,
        }
    }

    /// Runs until a terminal state or shutdown.
    pub(crate) async fn run(mut self) {
        loop {
            if self.token.is_cancelled() {
                return;
            }
            match self.status {
                Status::Running if self.remaining == 0 => return self.complete().await,
                Status::Running => {
                    tokio::select! {
                        biased;
                        _ = self.token.cancelled() => return,
                        cmd = self.commands.recv(), if self.commands_open => {
                            self.handle(cmd).await;
                        }
                        _ = sleep_until(self.next_tick) => {
                            if let Err(err) = self.tick_once().await {
                                return self.fail(err).await;
                            }
                        }
                    }
                }
                Status::Paused => {
                    if !self.commands_open {
                        // Nothing can resume a paused timer anymore.
                        return;
                    }
                    tokio::select! {
                        biased;
                        _ = self.token.cancelled() => return,
                        cmd = self.commands.recv() => self.handle(cmd).await,
                    }
                }
                Status::Cancelled | Status::Completed | Status::Failed => return,
            }
        }
    }

    /// One tick: emit (abortable), decrement, persist.
    ///
    /// Returns `Ok` without committing when a command or shutdown
    /// interrupted the emit; `next_tick` is left untouched so a still
    /// running timer retries the same value immediately.
    async fn tick_once(&mut self) -> Result<(), StoreError> {
        let cmd = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Ok(()),
            cmd = self.commands.recv(), if self.commands_open => Some(cmd),
            permit = self.output.reserve() => {
                if let Ok(permit) = permit {
                    permit.send(self.remaining);
                }
                // A closed output just means nobody is watching; the
                // countdown itself carries on.
                None
            }
        };
        if let Some(cmd) = cmd {
            self.handle(cmd).await;
            return Ok(());
        }

        self.remaining -= 1;
        self.publish_state();
        self.store.update_timer(&self.record()).await?;
        self.bus.publish(
            Event::new(EventKind::Tick)
                .with_timer(self.id)
                .with_remaining(self.remaining),
        );
        self.next_tick = Instant::now() + self.tick;
        Ok(())
    }

    async fn handle(&mut self, cmd: Option<Command>) {
        let Some(cmd) = cmd else {
            self.commands_open = false;
            return;
        };
        match cmd {
            Command::Start(ack) => {
                let _ = ack.send(self.do_start().await);
            }
            Command::Pause(ack) => {
                let _ = ack.send(self.do_pause().await);
            }
            Command::Resume(ack) => {
                let _ = ack.send(self.do_resume().await);
            }
            Command::Cancel(ack) => {
                let _ = ack.send(self.do_cancel().await);
            }
        }
    }

    /// Paused → Running, first start: the initial record is persisted
    /// here, making the store the arbiter for duplicate ids.
    async fn do_start(&mut self) -> Result<(), StoreError> {
        if self.status == Status::Running {
            return Ok(());
        }
        self.store
            .add_timer(&self.record().with_status(Status::Running))
            .await?;
        self.to_running();
        self.bus.publish(
            Event::new(EventKind::TimerStarted)
                .with_timer(self.id)
                .with_remaining(self.remaining),
        );
        Ok(())
    }

    async fn do_pause(&mut self) -> Result<(), StoreError> {
        if self.status != Status::Running {
            return Ok(());
        }
        // Persist first: a pause that cannot be recorded is reported to
        // the caller and the timer keeps running.
        self.store
            .update_timer(&self.record().with_status(Status::Paused))
            .await?;
        self.status = Status::Paused;
        self.publish_state();
        self.bus.publish(
            Event::new(EventKind::TimerPaused)
                .with_timer(self.id)
                .with_remaining(self.remaining),
        );
        Ok(())
    }

    async fn do_resume(&mut self) -> Result<(), StoreError> {
        if self.status != Status::Paused {
            return Ok(());
        }
        self.store
            .update_timer(&self.record().with_status(Status::Running))
            .await?;
        self.to_running();
        self.bus.publish(
            Event::new(EventKind::TimerResumed)
                .with_timer(self.id)
                .with_remaining(self.remaining),
        );
        Ok(())
    }

    async fn do_cancel(&mut self) -> Result<(), StoreError> {
        if self.status.is_terminal() {
            return Ok(());
        }
        self.status = Status::Cancelled;
        self.publish_state();
        let removed = self.store.remove_timer(self.id).await;
        self.bus
            .publish(Event::new(EventKind::TimerCancelled).with_timer(self.id));
        self.notify(Outcome::Cancelled).await;
        removed
    }

    /// Natural completion: cleanup is symmetric with cancellation — the
    /// actor removes its own record, the reaper only evicts the registry.
    async fn complete(&mut self) {
        self.status = Status::Completed;
        self.publish_state();
        let mut done = Event::new(EventKind::TimerCompleted).with_timer(self.id);
        if let Err(err) = self.store.remove_timer(self.id).await {
            // The record is stale now; restore treats terminal records
            // as garbage, so this only costs a restore-time cleanup.
            done = done.with_reason(format!("record cleanup failed: {err}"));
        }
        self.bus.publish(done);
        self.notify(Outcome::Completed).await;
    }

    /// Unrecoverable mid-countdown error: mark Failed and make the
    /// failure observable through the completion path.
    async fn fail(&mut self, err: StoreError) {
        self.status = Status::Failed;
        self.publish_state();
        self.bus.publish(
            Event::new(EventKind::TimerFailed)
                .with_timer(self.id)
                .with_remaining(self.remaining)
                .with_reason(err.to_string()),
        );
        self.notify(Outcome::Failed).await;
    }

    async fn notify(&self, outcome: Outcome) {
        if let Some(tx) = &self.completions {
            let _ = tx
                .send(Completion {
                    id: self.id,
                    outcome,
                })
                .await;
        }
    }

    fn to_running(&mut self) {
        self.status = Status::Running;
        self.publish_state();
        // First emit happens immediately; the wait comes after the tick.
        self.next_tick = Instant::now();
    }

    fn publish_state(&self) {
        let _ = self.state_tx.send(TimerState {
            status: self.status,
            remaining: self.remaining,
        });
    }

    fn record(&self) -> TimerRecord {
        TimerRecord {
            id: self.id,
            duration: self.duration,
            time_remaining: self.remaining,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    use crate::error::StoreError;
    use crate::events::Bus;
    use crate::store::{MemoryStore, Status, Store, TimerRecord};
    use crate::timers::{Timer, TimerParams};

    const TICK: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(5);

    fn spawn_timer(
        record: TimerRecord,
        store: Arc<dyn Store>,
        token: CancellationToken,
    ) -> Arc<Timer> {
        Timer::spawn(
            record,
            store,
            TimerParams {
                tick: TICK,
                bus: Bus::new(64),
                completions: None,
                token,
            },
        )
    }

    async fn recv(output: &mut tokio::sync::mpsc::Receiver<u64>) -> Option<u64> {
        timeout(WAIT, output.recv()).await.expect("output stalled")
    }

    #[tokio::test]
    async fn emits_full_sequence_then_closes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let timer = spawn_timer(
            TimerRecord::new(1, 3),
            Arc::clone(&store),
            CancellationToken::new(),
        );
        assert_eq!(timer.status(), Status::Paused);

        timer.start().await.unwrap();
        let mut output = timer.take_output().await.unwrap();

        let mut seen = Vec::new();
        while let Some(remaining) = recv(&mut output).await {
            seen.push(remaining);
        }
        assert_eq!(seen, vec![3, 2, 1]);

        timer.wait().await;
        assert_eq!(timer.status(), Status::Completed);
        assert!(matches!(
            store.get_timer(1).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn zero_duration_completes_without_emitting() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let timer = spawn_timer(
            TimerRecord::new(2, 0),
            Arc::clone(&store),
            CancellationToken::new(),
        );

        timer.start().await.unwrap();
        let mut output = timer.take_output().await.unwrap();
        assert_eq!(recv(&mut output).await, None);

        timer.wait().await;
        assert_eq!(timer.status(), Status::Completed);
        assert!(matches!(
            store.get_timer(2).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn pause_resume_continues_without_gap_or_duplicate() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let timer = spawn_timer(
            TimerRecord::new(3, 5),
            Arc::clone(&store),
            CancellationToken::new(),
        );

        timer.start().await.unwrap();
        let mut output = timer.take_output().await.unwrap();

        let mut seen = Vec::new();
        seen.push(recv(&mut output).await.unwrap());
        seen.push(recv(&mut output).await.unwrap());

        timer.pause().await.unwrap();
        assert_eq!(timer.status(), Status::Paused);
        let paused = store.get_timer(3).await.unwrap();
        assert_eq!(paused.status, Status::Paused);

        timer.resume().await.unwrap();
        assert_eq!(timer.status(), Status::Running);

        while let Some(remaining) = recv(&mut output).await {
            seen.push(remaining);
        }
        assert_eq!(seen, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn cancel_removes_record_and_closes_stream() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let timer = spawn_timer(
            TimerRecord::new(4, 1000),
            Arc::clone(&store),
            CancellationToken::new(),
        );

        timer.start().await.unwrap();
        let mut output = timer.take_output().await.unwrap();
        let first = recv(&mut output).await.unwrap();
        assert_eq!(first, 1000);

        timer.cancel().await.unwrap();
        assert_eq!(timer.status(), Status::Cancelled);
        assert!(matches!(
            store.get_timer(4).await,
            Err(StoreError::NotFound)
        ));

        // At most one value was already buffered before the cancel.
        let mut trailing = 0;
        while recv(&mut output).await.is_some() {
            trailing += 1;
        }
        assert!(trailing <= 1, "got {trailing} values after cancel");
    }

    #[tokio::test]
    async fn transitions_are_idempotent() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let timer = spawn_timer(
            TimerRecord::new(5, 50),
            Arc::clone(&store),
            CancellationToken::new(),
        );

        timer.start().await.unwrap();
        timer.resume().await.unwrap(); // already running
        timer.pause().await.unwrap();
        timer.pause().await.unwrap(); // already paused
        assert_eq!(timer.status(), Status::Paused);
    }

    #[tokio::test]
    async fn shutdown_token_preserves_record() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let token = CancellationToken::new();
        let timer = spawn_timer(TimerRecord::new(6, 40), Arc::clone(&store), token.clone());

        timer.start().await.unwrap();
        let mut output = timer.take_output().await.unwrap();
        recv(&mut output).await.unwrap();

        token.cancel();
        timer.wait().await;

        // The record stays restorable; no terminal cleanup on shutdown.
        let rec = store.get_timer(6).await.unwrap();
        assert_eq!(rec.status, Status::Running);
        assert!(rec.time_remaining < 40);
    }

    /// Store wrapper that fails every update after the first `allowed`.
    struct FlakyStore {
        inner: MemoryStore,
        allowed: usize,
        updates: AtomicUsize,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn list_timers(&self) -> Result<Vec<TimerRecord>, StoreError> {
            self.inner.list_timers().await
        }

        async fn add_timer(&self, record: &TimerRecord) -> Result<(), StoreError> {
            self.inner.add_timer(record).await
        }

        async fn get_timer(&self, id: u64) -> Result<TimerRecord, StoreError> {
            self.inner.get_timer(id).await
        }

        async fn update_timer(&self, record: &TimerRecord) -> Result<(), StoreError> {
            if self.updates.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                return Err(StoreError::Backend(sled::Error::Unsupported(
                    "injected failure".to_string(),
                )));
            }
            self.inner.update_timer(record).await
        }

        async fn remove_timer(&self, id: u64) -> Result<(), StoreError> {
            self.inner.remove_timer(id).await
        }
    }

    #[tokio::test]
    async fn persistence_failure_mid_countdown_fails_the_timer() {
        let store: Arc<dyn Store> = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            allowed: 2,
            updates: AtomicUsize::new(0),
        });
        let timer = spawn_timer(
            TimerRecord::new(7, 100),
            Arc::clone(&store),
            CancellationToken::new(),
        );

        timer.start().await.unwrap();
        let mut output = timer.take_output().await.unwrap();
        while recv(&mut output).await.is_some() {}

        timer.wait().await;
        assert_eq!(timer.status(), Status::Failed);
    }
}
