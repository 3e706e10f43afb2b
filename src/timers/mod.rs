//! # Timer handles and externally visible timer state.
//!
//! A [`Timer`] is the public face of one countdown: a cheap handle holding
//! the command channel into the timer's actor, a watch on its state, and
//! the receiving end of its output stream. The countdown itself runs in
//! the actor task (`core::actor`); the handle never mutates state
//! directly, it only sends messages.

mod state;
mod timer;

pub use state::TimerState;
pub use timer::{Timer, TimerParams};

pub(crate) use timer::Command;
