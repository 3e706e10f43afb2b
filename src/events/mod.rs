//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the service, the reaper,
//! and the per-timer countdown actors.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Service` (start/restore/shutdown), `TimerActor`
//!   (ticks and terminal transitions), the reaper (registry evictions).
//! - **Consumers**: the service's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::SubscriberSet)) and anything holding a
//!   receiver from [`Service::subscribe`](crate::Service::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
