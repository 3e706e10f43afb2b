//! # Event subscribers.
//!
//! Hooks for observing the runtime: the [`Subscribe`] trait is the
//! extension point, [`SubscriberSet`] fans events out to all registered
//! subscribers without letting any of them block the publishers.
//!
//! ```text
//!   Bus ──► subscriber listener ──► SubscriberSet::emit(&Event)
//!                                     ├──► [queue S1] ─► worker ─► S1.on_event()
//!                                     ├──► [queue S2] ─► worker ─► S2.on_event()
//!                                     └──► [queue SN] ─► worker ─► SN.on_event()
//! ```
//!
//! A simple stdout `LogWriter` ships behind the `logging` feature for
//! demos and debugging; production observers (metrics, alerting) implement
//! [`Subscribe`] themselves.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
