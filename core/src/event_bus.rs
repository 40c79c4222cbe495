//! Topic-based broadcast for cross-screen notifications.
//!
//! This module provides the [`EventBus`] trait for fire-and-forget
//! notifications between UI surfaces - for example the `address-saved`
//! broadcast a list screen uses to refresh its reference data after an
//! address draft is submitted.
//!
//! # Key Principles
//!
//! - **At-most-once**: delivery is best-effort; if no listener is mounted
//!   when a topic fires, the event is dropped
//! - **Topic name only**: no payload, no acknowledgment
//! - **Process-local**: this is an in-process pub/sub seam, not a message
//!   queue
//!
//! # Example
//!
//! ```
//! use trolley_core::event_bus::{EventBus, LocalEventBus};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = LocalEventBus::new();
//! let mut rx = bus.subscribe("address-saved");
//!
//! bus.publish("address-saved");
//! assert!(rx.try_recv().is_ok());
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Capacity of each per-topic channel. Listeners that lag past this many
/// unconsumed events start dropping the oldest, which is acceptable for
/// refresh-style notifications.
const TOPIC_CAPACITY: usize = 16;

/// Trait for fire-and-forget topic broadcast.
///
/// All implementations must be `Send + Sync` so reducers can capture the
/// bus inside effects.
pub trait EventBus: Send + Sync {
    /// Publish an event on `topic`.
    ///
    /// Best-effort: if nothing is subscribed, the event is silently
    /// dropped.
    fn publish(&self, topic: &str);

    /// Subscribe to `topic`, receiving a unit notification per publish.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<()>;
}

/// Process-local event bus backed by one broadcast channel per topic.
///
/// Channels are created lazily on first subscribe or publish and live for
/// the lifetime of the bus.
#[derive(Debug, Default)]
pub struct LocalEventBus {
    topics: Mutex<HashMap<String, broadcast::Sender<()>>>,
}

impl LocalEventBus {
    /// Create a new bus with no topics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<()> {
        let mut topics = self
            .topics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }
}

impl EventBus for LocalEventBus {
    fn publish(&self, topic: &str) {
        let sender = self.sender_for(topic);
        // send() errors when there are no receivers, which at-most-once
        // semantics already allow.
        match sender.send(()) {
            Ok(listeners) => {
                tracing::debug!(topic, listeners, "published event");
            },
            Err(_) => {
                tracing::debug!(topic, "published event with no listeners");
            },
        }
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<()> {
        self.sender_for(topic).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = LocalEventBus::new();
        let mut rx = bus.subscribe("address-saved");

        bus.publish("address-saved");

        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn publish_without_listener_is_dropped() {
        let bus = LocalEventBus::new();

        // No subscriber mounted - must not panic or error.
        bus.publish("address-saved");

        // A listener mounted afterwards does not see the old event.
        let mut rx = bus.subscribe("address-saved");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn topics_are_independent() {
        let bus = LocalEventBus::new();
        let mut saved = bus.subscribe("address-saved");
        let mut other = bus.subscribe("catalog-refreshed");

        bus.publish("address-saved");

        assert!(saved.try_recv().is_ok());
        assert!(other.try_recv().is_err());
    }
}
