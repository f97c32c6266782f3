// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named in-process broadcast bus.
//!
//! The Rust analog of a same-origin BroadcastChannel: every queue instance
//! that opens the same channel name shares one tokio broadcast channel.
//! Envelopes carry the sender's origin id so receivers can drop their own
//! messages, which is what prevents replication loops.
//!
//! Channel senders live in a process-wide registry for the lifetime of the
//! process, so late-opening instances always attach to the same channel.

use std::sync::OnceLock;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use haven_core::QueueEvent;

/// One broadcast message: the event plus the sending instance's origin.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: Uuid,
    pub event: QueueEvent,
}

static REGISTRY: OnceLock<DashMap<String, broadcast::Sender<Envelope>>> = OnceLock::new();

fn registry() -> &'static DashMap<String, broadcast::Sender<Envelope>> {
    REGISTRY.get_or_init(DashMap::new)
}

/// Handle onto a named broadcast channel with a unique origin identity.
pub struct LocalBroadcast {
    name: String,
    origin: Uuid,
    tx: broadcast::Sender<Envelope>,
}

impl LocalBroadcast {
    /// Attach to (or create) the named channel.
    pub fn open(name: &str, capacity: usize) -> Self {
        let tx = registry()
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(capacity.max(1)).0)
            .value()
            .clone();
        let origin = Uuid::new_v4();
        debug!(channel = name, %origin, "local broadcast attached");
        Self {
            name: name.to_string(),
            origin,
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Origin identity stamped on every outbound envelope. Receivers must
    /// skip envelopes carrying their own origin.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    /// Subscribe to envelopes from all instances on this channel,
    /// including this one (the caller filters by origin).
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Send an event to every other attached instance.
    ///
    /// Returns the number of receivers reached. Having no receivers is not
    /// a failure; a single-instance process simply broadcasts into the void.
    pub fn send(&self, event: QueueEvent) -> usize {
        self.tx
            .send(Envelope {
                origin: self.origin,
                event,
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::RequestId;

    fn delete_event(id: &str) -> QueueEvent {
        QueueEvent::Delete {
            request_id: RequestId::from(id),
        }
    }

    #[tokio::test]
    async fn same_name_shares_a_channel() {
        let a = LocalBroadcast::open("test_shared", 8);
        let b = LocalBroadcast::open("test_shared", 8);
        assert_ne!(a.origin(), b.origin());

        let mut rx_b = b.subscribe();
        assert_eq!(a.send(delete_event("r1")), 1);

        let envelope = rx_b.recv().await.unwrap();
        assert_eq!(envelope.origin, a.origin());
        assert_eq!(envelope.event.request_id().as_str(), "r1");
    }

    #[tokio::test]
    async fn different_names_are_isolated() {
        let a = LocalBroadcast::open("test_isolated_a", 8);
        let b = LocalBroadcast::open("test_isolated_b", 8);

        let mut rx_b = b.subscribe();
        a.send(delete_event("r1"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_receivers_is_not_an_error() {
        let a = LocalBroadcast::open("test_void", 8);
        assert_eq!(a.send(delete_event("r1")), 0);
    }

    #[tokio::test]
    async fn sender_sees_its_own_envelopes_tagged_with_its_origin() {
        let a = LocalBroadcast::open("test_self", 8);
        let mut rx = a.subscribe();
        a.send(delete_event("r1"));

        // The origin tag is what lets the receiving side drop this.
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.origin, a.origin());
    }
}
