//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [started] timer=1 duration=10
//! [tick] timer=1 remaining=9
//! [paused] timer=1 remaining=7
//! [resumed] timer=1 remaining=7
//! [completed] timer=1
//! [removed] timer=1
//! [restore-failed] timer=2 reason="record codec error: ..."
//! [shutdown-requested]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Subscribe`] for structured logging or metrics.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::TimerStarted => {
                if let (Some(id), Some(rem)) = (e.timer, e.remaining) {
                    println!("[started] timer={id} duration={rem}");
                }
            }
            EventKind::Tick => {
                if let (Some(id), Some(rem)) = (e.timer, e.remaining) {
                    println!("[tick] timer={id} remaining={rem}");
                }
            }
            EventKind::TimerPaused => {
                println!("[paused] timer={:?} remaining={:?}", e.timer, e.remaining);
            }
            EventKind::TimerResumed => {
                println!("[resumed] timer={:?} remaining={:?}", e.timer, e.remaining);
            }
            EventKind::TimerCancelled => {
                println!("[cancelled] timer={:?}", e.timer);
            }
            EventKind::TimerCompleted => {
                println!("[completed] timer={:?}", e.timer);
            }
            EventKind::TimerFailed => {
                println!("[failed] timer={:?} reason={:?}", e.timer, e.reason);
            }
            EventKind::TimerRestored => {
                println!("[restored] timer={:?} remaining={:?}", e.timer, e.remaining);
            }
            EventKind::RestoreFailed => {
                println!("[restore-failed] timer={:?} reason={:?}", e.timer, e.reason);
            }
            EventKind::TimerRemoved => {
                println!("[removed] timer={:?}", e.timer);
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
