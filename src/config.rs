//! # Global service configuration.
//!
//! Provides [`Config`], the centralized settings for a [`Service`](crate::Service).
//!
//! ## Sentinel values
//! - `tick` below 1ms is clamped (a zero tick would spin the countdown loop)
//! - `bus_capacity` and `completion_capacity` are clamped to a minimum of 1

use std::path::PathBuf;
use std::time::Duration;

/// Minimum tick unit the countdown loop will honor.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Configuration for the countdown service runtime.
///
/// ## Field semantics
/// - `db_path`: location of the embedded store file (ignored when a store
///   instance is supplied to [`Service::with_store`](crate::Service::with_store))
/// - `tick`: duration of one time unit — each tick emits, decrements and
///   persists once, then waits this long
/// - `bus_capacity`: event bus ring buffer size (slow subscribers lag past it)
/// - `completion_capacity`: bound of the completion queue drained by the reaper
/// - `grace`: maximum wait for timers to stop during graceful shutdown
#[derive(Clone, Debug)]
pub struct Config {
    /// Filesystem path of the persistent store.
    pub db_path: PathBuf,

    /// Duration of one countdown time unit.
    ///
    /// Clamped to a minimum of 1ms by [`Config::tick_clamped`]; tests
    /// typically shrink this to a few milliseconds.
    pub tick: Duration,

    /// Capacity of the event bus broadcast ring buffer.
    pub bus_capacity: usize,

    /// Capacity of the bounded completion queue.
    ///
    /// Completing timers briefly await space here when the reaper is busy;
    /// a larger bound smooths bursts of simultaneous completions.
    pub completion_capacity: usize,

    /// Maximum time to wait for timer actors to exit during shutdown.
    pub grace: Duration,
}

impl Config {
    /// Returns the tick unit clamped to the supported minimum.
    #[inline]
    pub fn tick_clamped(&self) -> Duration {
        self.tick.max(MIN_TICK)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a completion queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn completion_capacity_clamped(&self) -> usize {
        self.completion_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `db_path = "countdown.db"`
    /// - `tick = 1s` (one time unit per second)
    /// - `bus_capacity = 1024`
    /// - `completion_capacity = 64`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("countdown.db"),
            tick: Duration::from_secs(1),
            bus_capacity: 1024,
            completion_capacity: 64,
            grace: Duration::from_secs(30),
        }
    }
}
