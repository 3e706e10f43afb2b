//! # countdown
//!
//! **countdown** is a small library for running persistent countdown
//! timers: each timer ticks down from a fixed duration to zero, streams
//! its remaining time to a consumer, can be paused, resumed and cancelled
//! by id, and survives process restarts through an embedded store.
//!
//! ## Architecture
//! ```text
//!     start_timer / get_timer / pause / resume / cancel
//!                          ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Service                                                      │
//! │  - Registry (live id → Timer handles, cache over the Store)   │
//! │  - Bus (broadcast events) + SubscriberSet fan-out             │
//! │  - bounded completion queue + single reaper task              │
//! └───────┬──────────────────┬──────────────────┬─────────────────┘
//!         ▼                  ▼                  ▼
//!   ┌────────────┐    ┌────────────┐    ┌────────────┐
//!   │ TimerActor │    │ TimerActor │    │ TimerActor │   one per timer
//!   │ tick loop  │    │ tick loop  │    │ tick loop  │
//!   └─────┬──────┘    └─────┬──────┘    └─────┬──────┘
//!         │ emit remaining  │ persist a record │ Completion on exit
//!         ▼                 ▼                  ▼
//!    output stream     Store ("timers",   completion queue ─► reaper
//!    (per timer)        8-byte LE keys)       (evicts registry)
//! ```
//!
//! Each tick emits the current remaining time on the timer's output
//! stream (consumer-paced: an unread timer stalls after one buffered
//! value), decrements, and persists the record before waiting one tick
//! unit. Transitions arrive at the actor as messages, so cancellation is
//! cooperative and takes effect strictly before the next emit.
//!
//! ## Restarts
//! Every running or paused timer has a persisted record; on startup the
//! service reconstructs each one with a fresh output stream and resumes
//! ticking where the record left off (paused records stay paused).
//!
//! ## Example
//! ```no_run
//! use countdown::{Config, Service};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Service::start(Config::default(), Vec::new()).await?;
//!
//!     let timer = service.start_timer(1, 10).await?;
//!     let mut output = timer.take_output().await.ok_or("output already taken")?;
//!     while let Some(remaining) = output.recv().await {
//!         println!("t-minus {remaining}");
//!     }
//!
//!     service.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod store;
mod subscribers;
mod timers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Completion, Outcome, Service};
pub use error::{ServiceError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use store::{key, MemoryStore, SledStore, Status, Store, TimerRecord};
pub use subscribers::{Subscribe, SubscriberSet};
pub use timers::{Timer, TimerParams, TimerState};

// Optional: a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
