//! # Service: timer registry, restore, and lifecycle orchestration.
//!
//! The [`Service`] owns the narrow end of everything: the store handle,
//! the registry of live timers, the event bus, the bounded completion
//! queue, and the runtime cancellation token. Timers do their own work;
//! the service only creates them, finds them, and cleans up after them.
//!
//! ## High-level wiring
//! ```text
//! Service::start(cfg, subscribers)
//!   ├─► SledStore::open(cfg.db_path)        (or an injected Store)
//!   ├─► subscriber listener: Bus ─► SubscriberSet::emit (fire-and-forget)
//!   ├─► restore(): Store::list_timers()
//!   │     ├─ Paused record  ─► actor spawned, waiting
//!   │     ├─ Running record ─► actor spawned, ticking
//!   │     └─ stale/terminal ─► record deleted, RestoreFailed published
//!   └─► reaper: completion queue ─► registry eviction
//!
//! start_timer(id, d) ──► registry.try_register
//!                          └─► Timer::spawn + Timer::start
//!                                └─► Store::add_timer   (duplicate arbiter)
//!
//! Shutdown path:
//!   shutdown() ─► publish(ShutdownRequested) ─► token.cancel()
//!              ─► drain registry, join actors within cfg.grace
//!                   ├─ all joined  ─► AllStoppedWithin
//!                   └─ grace hit   ─► GraceExceeded { stuck ids }
//! ```
//!
//! ## Registry vs Store
//! The store is canonical; the registry is a cache of timers whose actor
//! task exists right now. `get_timer` lazy-loads missing entries from the
//! store; cancel/complete/fail evict them. One deliberate asymmetry from
//! that rule: `cancel_timer` only consults the registry, so a
//! persisted-but-unloaded timer must be materialized through `get_timer`
//! before it can be cancelled.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};
use crate::store::{SledStore, Store, TimerRecord};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::timers::{Timer, TimerParams};

use super::reaper;
use super::registry::Registry;
use super::shutdown;

/// Countdown timer service: registry, restore, reaper, shutdown.
pub struct Service {
    cfg: Config,
    store: Arc<dyn Store>,
    registry: Arc<Registry>,
    bus: Bus,
    completions: mpsc::Sender<reaper::Completion>,
    token: CancellationToken,
}

impl Service {
    /// Opens the embedded store at `cfg.db_path` and starts the service.
    pub async fn start(
        cfg: Config,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, ServiceError> {
        let store = SledStore::open(&cfg.db_path)?;
        Self::with_store(Arc::new(store), cfg, subscribers).await
    }

    /// Starts the service on a caller-supplied store.
    ///
    /// Restores every persisted timer (fresh output streams — stream
    /// consumers cannot survive a restart), then spawns the reaper.
    /// Individual restore failures are published and skipped; only a
    /// failing `list_timers` aborts startup.
    pub async fn with_store(
        store: Arc<dyn Store>,
        cfg: Config,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, ServiceError> {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let (completion_tx, completion_rx) = mpsc::channel(cfg.completion_capacity_clamped());

        let service = Self {
            cfg,
            store,
            registry: Registry::new(),
            bus,
            completions: completion_tx,
            token: CancellationToken::new(),
        };

        service.spawn_subscriber_listener(subscribers);
        service.restore().await?;
        tokio::spawn(reaper::reap(
            Arc::clone(&service.registry),
            completion_rx,
            service.bus.clone(),
            service.token.clone(),
        ));
        Ok(service)
    }

    /// Creates a timer and starts its countdown.
    ///
    /// Fails `AlreadyExists` when the id is live **or** persisted; the
    /// store's atomic add decides races between concurrent callers.
    pub async fn start_timer(&self, id: u64, duration: u64) -> Result<Arc<Timer>, ServiceError> {
        self.registry
            .try_register(id, || async move {
                let timer = self.spawn_timer(TimerRecord::new(id, duration));
                timer.start().await?;
                Ok(timer)
            })
            .await
    }

    /// Cancels a **live** timer and removes it from registry and store.
    ///
    /// A persisted-but-unloaded timer is not found by this path; load it
    /// with [`Service::get_timer`] first.
    pub async fn cancel_timer(&self, id: u64) -> Result<(), ServiceError> {
        let timer = self
            .registry
            .remove(id)
            .await
            .ok_or(ServiceError::NotFound)?;
        timer.cancel().await
    }

    /// Pauses a timer, lazy-loading it if necessary.
    pub async fn pause_timer(&self, id: u64) -> Result<(), ServiceError> {
        self.get_timer(id).await?.pause().await
    }

    /// Resumes a timer, lazy-loading it if necessary.
    pub async fn resume_timer(&self, id: u64) -> Result<(), ServiceError> {
        self.get_timer(id).await?.resume().await
    }

    /// Returns the live handle for `id`, loading it from the store when
    /// it is persisted but not yet materialized.
    ///
    /// A loaded timer gets a fresh output stream and continues from its
    /// persisted remaining time; it ticks only if it was persisted
    /// Running. Fails `NotFound` when the id is in neither place.
    pub async fn get_timer(&self, id: u64) -> Result<Arc<Timer>, ServiceError> {
        if let Some(timer) = self.registry.get(id).await {
            return Ok(timer);
        }

        let loaded = self
            .registry
            .try_register(id, || async move {
                let record = self.store.get_timer(id).await?;
                Ok(self.spawn_timer(record))
            })
            .await;

        match loaded {
            Ok(timer) => {
                self.bus.publish(
                    Event::new(EventKind::TimerRestored)
                        .with_timer(id)
                        .with_remaining(timer.remaining()),
                );
                Ok(timer)
            }
            // Lost a race against another loader; take their entry.
            Err(ServiceError::AlreadyExists) => {
                self.registry.get(id).await.ok_or(ServiceError::NotFound)
            }
            Err(err) => Err(err),
        }
    }

    /// Sorted ids of all currently live timers.
    pub async fn active_timers(&self) -> Vec<u64> {
        self.registry.ids().await
    }

    /// New receiver on the event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Graceful shutdown: stop all actors, wait up to `cfg.grace`.
    ///
    /// Actors exit at their next checkpoint without touching the store,
    /// so in-flight timers restore on the next start. Returns
    /// [`ServiceError::GraceExceeded`] with the stuck ids when the grace
    /// window closes first.
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();

        let timers = self.registry.drain().await;
        let grace = self.cfg.grace;
        let deadline = Instant::now() + grace;

        let mut stuck = Vec::new();
        for timer in &timers {
            let left = deadline.saturating_duration_since(Instant::now());
            if timeout(left, timer.wait()).await.is_err() {
                stuck.push(timer.id());
            }
        }

        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            self.bus.publish(Event::new(EventKind::GraceExceeded));
            Err(ServiceError::GraceExceeded { grace, stuck })
        }
    }

    /// Blocks until SIGINT/SIGTERM, then runs a graceful [`Service::shutdown`].
    pub async fn run_until_signal(&self) -> Result<(), ServiceError> {
        let _ = shutdown::wait_for_signal().await;
        self.shutdown().await
    }

    /// Reconstructs timers from persisted records at startup.
    async fn restore(&self) -> Result<(), ServiceError> {
        let records = self.store.list_timers().await?;
        for record in records {
            let id = record.id;
            let remaining = record.time_remaining;

            if record.status.is_terminal() {
                // A terminal record means a crash interrupted cleanup;
                // finish the job instead of resurrecting the timer.
                let _ = self.store.remove_timer(id).await;
                self.bus.publish(
                    Event::new(EventKind::RestoreFailed)
                        .with_timer(id)
                        .with_reason(format!("stale terminal record ({})", record.status)),
                );
                continue;
            }

            let restored = self
                .registry
                .try_register(id, || async move { Ok(self.spawn_timer(record)) })
                .await;
            match restored {
                Ok(_) => self.bus.publish(
                    Event::new(EventKind::TimerRestored)
                        .with_timer(id)
                        .with_remaining(remaining),
                ),
                Err(err) => self.bus.publish(
                    Event::new(EventKind::RestoreFailed)
                        .with_timer(id)
                        .with_reason(err.to_string()),
                ),
            }
        }
        Ok(())
    }

    fn spawn_timer(&self, record: TimerRecord) -> Arc<Timer> {
        Timer::spawn(
            record,
            Arc::clone(&self.store),
            TimerParams {
                tick: self.cfg.tick_clamped(),
                bus: self.bus.clone(),
                completions: Some(self.completions.clone()),
                token: self.token.child_token(),
            },
        )
    }

    /// Forwards bus events to the subscriber set until the bus closes.
    fn spawn_subscriber_listener(&self, subscribers: Vec<Arc<dyn Subscribe>>) {
        if subscribers.is_empty() {
            return;
        }
        let set = SubscriberSet::new(subscribers);
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use crate::error::StoreError;
    use crate::store::{MemoryStore, Status};

    const WAIT: Duration = Duration::from_secs(5);

    fn test_config(tick: Duration) -> Config {
        Config {
            tick,
            grace: Duration::from_secs(2),
            ..Config::default()
        }
    }

    async fn start_service(store: Arc<dyn Store>) -> Service {
        start_service_with_tick(store, Duration::from_millis(10)).await
    }

    async fn start_service_with_tick(store: Arc<dyn Store>, tick: Duration) -> Service {
        Service::with_store(store, test_config(tick), Vec::new())
            .await
            .unwrap()
    }

    /// Polls until the service's registry is empty or the wait expires.
    async fn reaped(service: &Service) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if service.active_timers().await.is_empty() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn start_timer_persists_and_cancel_cleans_up() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(Arc::clone(&store)).await;

        let timer = service.start_timer(1, 10).await.unwrap();
        assert_eq!(timer.id(), 1);
        assert_eq!(timer.duration(), 10);

        let rec = store.get_timer(1).await.unwrap();
        assert_eq!(rec.duration, 10);
        assert_eq!(rec.status, Status::Running);

        service.cancel_timer(1).await.unwrap();
        assert!(service.active_timers().await.is_empty());
        assert!(matches!(
            store.get_timer(1).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            service.get_timer(1).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            service.cancel_timer(1).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(Arc::clone(&store)).await;

        let timer = service.start_timer(1, 60).await.unwrap();
        assert!(matches!(
            service.start_timer(1, 5).await,
            Err(ServiceError::AlreadyExists)
        ));
        // The existing timer is untouched by the failed attempt.
        assert_eq!(timer.duration(), 60);
        assert_eq!(store.get_timer(1).await.unwrap().duration, 60);

        // Persisted but not live counts as existing too.
        store.add_timer(&TimerRecord::new(2, 4)).await.unwrap();
        assert!(matches!(
            service.start_timer(2, 4).await,
            Err(ServiceError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn concurrent_starts_one_winner() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(store).await;

        let (a, b) = tokio::join!(service.start_timer(9, 30), service.start_timer(9, 30));
        assert!(a.is_ok() != b.is_ok(), "exactly one start must win");
        assert!(matches!(
            a.or(b),
            Ok(_)
        ));
    }

    #[tokio::test]
    async fn natural_completion_evicts_registry_and_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(Arc::clone(&store)).await;
        let mut events = service.subscribe();

        let timer = service.start_timer(1, 2).await.unwrap();
        let mut output = timer.take_output().await.unwrap();

        let mut seen = Vec::new();
        while let Some(v) = timeout(WAIT, output.recv()).await.unwrap() {
            seen.push(v);
        }
        assert_eq!(seen, vec![2, 1]);

        assert!(reaped(&service).await, "completed timer was not reaped");
        assert!(matches!(
            store.get_timer(1).await,
            Err(StoreError::NotFound)
        ));

        // Lifecycle shows up on the bus, eviction included.
        let mut kinds = Vec::new();
        while let Ok(Ok(ev)) = timeout(Duration::from_millis(200), events.recv()).await {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::TimerStarted));
        assert!(kinds.contains(&EventKind::Tick));
        assert!(kinds.contains(&EventKind::TimerCompleted));
        assert!(kinds.contains(&EventKind::TimerRemoved));
    }

    #[tokio::test]
    async fn cancel_needs_a_live_timer_but_get_lazy_loads() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(Arc::clone(&store)).await;

        // Persisted behind the service's back: not live, so not cancellable.
        let mut rec = TimerRecord::new(7, 9);
        rec.time_remaining = 4;
        store.add_timer(&rec).await.unwrap();
        assert!(matches!(
            service.cancel_timer(7).await,
            Err(ServiceError::NotFound)
        ));

        // get_timer materializes it from the store, paused where it left off.
        let timer = service.get_timer(7).await.unwrap();
        assert_eq!(timer.status(), Status::Paused);
        assert_eq!(timer.remaining(), 4);
        assert_eq!(service.active_timers().await, vec![7]);

        service.cancel_timer(7).await.unwrap();
        assert!(matches!(
            store.get_timer(7).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn pause_resume_through_the_service() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(store).await;

        service.start_timer(3, 30).await.unwrap();
        service.pause_timer(3).await.unwrap();
        assert_eq!(service.get_timer(3).await.unwrap().status(), Status::Paused);

        service.resume_timer(3).await.unwrap();
        assert_eq!(
            service.get_timer(3).await.unwrap().status(),
            Status::Running
        );

        assert!(matches!(
            service.pause_timer(99).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn restart_restores_paused_timer_and_finishes_the_sequence() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        // A wide tick keeps the pause well inside the gap between ticks.
        let tick = Duration::from_millis(50);

        // First life: consume two ticks, pause, shut down.
        let service = start_service_with_tick(Arc::clone(&store), tick).await;
        let timer = service.start_timer(1, 3).await.unwrap();
        let mut output = timer.take_output().await.unwrap();
        assert_eq!(timeout(WAIT, output.recv()).await.unwrap(), Some(3));
        assert_eq!(timeout(WAIT, output.recv()).await.unwrap(), Some(2));
        service.pause_timer(1).await.unwrap();
        service.shutdown().await.unwrap();

        let parked = store.get_timer(1).await.unwrap();
        assert_eq!(parked.status, Status::Paused);

        // Second life: restored from the record, resumes mid-sequence.
        let service = start_service_with_tick(Arc::clone(&store), tick).await;
        assert_eq!(service.active_timers().await, vec![1]);
        let timer = service.get_timer(1).await.unwrap();
        let mut output = timer.take_output().await.unwrap();

        service.resume_timer(1).await.unwrap();
        let mut tail = Vec::new();
        while let Some(v) = timeout(WAIT, output.recv()).await.unwrap() {
            tail.push(v);
        }
        assert_eq!(*tail.first().unwrap(), parked.time_remaining);
        assert_eq!(*tail.last().unwrap(), 1);
        assert!(tail.windows(2).all(|w| w[0] == w[1] + 1));

        assert!(
            reaped(&service).await,
            "restored timer was not reaped after completion"
        );
        assert!(matches!(
            store.get_timer(1).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn restart_running_record_resumes_ticking_unprompted() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let rec = TimerRecord {
            id: 4,
            duration: 9,
            time_remaining: 2,
            status: Status::Running,
        };
        store.add_timer(&rec).await.unwrap();

        let service = start_service(Arc::clone(&store)).await;
        let timer = service.get_timer(4).await.unwrap();
        let mut output = timer.take_output().await.unwrap();

        let mut seen = Vec::new();
        while let Some(v) = timeout(WAIT, output.recv()).await.unwrap() {
            seen.push(v);
        }
        assert_eq!(seen, vec![2, 1]);
        assert!(matches!(
            store.get_timer(4).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn restore_deletes_stale_terminal_records() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .add_timer(&TimerRecord::new(5, 8).with_status(Status::Cancelled))
            .await
            .unwrap();

        let service = start_service(Arc::clone(&store)).await;
        assert!(service.active_timers().await.is_empty());
        assert!(matches!(
            store.get_timer(5).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn shutdown_within_grace_keeps_records_restorable() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = start_service(Arc::clone(&store)).await;

        // Never consumed: the countdown stalls on its blocked emit, which
        // is exactly where shutdown has to be able to interrupt it.
        service.start_timer(1, 1000).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        service.shutdown().await.unwrap();

        let rec = store.get_timer(1).await.unwrap();
        assert_eq!(rec.status, Status::Running);
        assert!(rec.time_remaining > 0);
    }
}
