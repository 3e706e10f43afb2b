//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] providing
//! non-blocking event publishing from multiple sources (timer actors, the
//! reaper, the service itself).
//!
//! ```text
//! Publishers (many):                Subscribers (any):
//!   Actor 1 ──┐
//!   Actor 2 ──┼─────► Bus ────┬───► subscriber listener ──► SubscriberSet
//!   Reaper  ──┤  (broadcast)  └───► Service::subscribe() receivers
//!   Service ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks; it is a plain `broadcast::Sender::send`.
//! - A bounded ring buffer stores recent events for all receivers; slow
//!   receivers observe `RecvError::Lagged(n)` and skip `n` oldest items.
//! - Events are dropped when no receiver is subscribed at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (the sender is `Arc`-backed); every actor holds one.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given ring-buffer capacity (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// Returns immediately; if there are no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn delivers_to_all_receivers() {
        let bus = Bus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(Event::new(EventKind::Tick).with_timer(1));

        assert_eq!(a.recv().await.unwrap().timer, Some(1));
        assert_eq!(b.recv().await.unwrap().timer, Some(1));
    }

    #[test]
    fn publish_without_receivers_is_fine() {
        let bus = Bus::new(1);
        bus.publish(Event::new(EventKind::ShutdownRequested));
    }
}
