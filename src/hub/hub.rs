//! # Delivery hub: live connections and topic subscriptions.
//!
//! [`Hub`] tracks which connections are alive and which topics each of them is
//! interested in. Fan-out callers ask for a **snapshot** of a topic's
//! subscribers and iterate that copy, so concurrent (un)subscribe or removal
//! never affects an iteration in progress.
//!
//! ## Architecture
//! ```text
//!                    RwLock<State>
//!   add_connection ──► connections: id → Arc<dyn Connection>
//!   subscribe      ──► topics:      topic → {id, id, ...}
//!   remove_connection ─► drops id from `connections` AND every topic set
//!   subscribers(topic) ─► snapshot Vec<Arc<dyn Connection>> (sorted by id)
//! ```
//!
//! ## Rules
//! - Subscribing an unknown connection is an error returned to the caller.
//! - Unknown topics are "no subscribers", never an error.
//! - Topic sets may stay empty after the last unsubscribe.
//! - A removed connection is never handed back by [`Hub::subscribers`].

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::error::HubError;
use crate::events::{Bus, Event, EventKind};
use crate::hub::connection::{ConnectionId, ConnectionRef, Topic};

#[derive(Default)]
struct State {
    connections: HashMap<ConnectionId, ConnectionRef>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl State {
    fn resolve(&self, ids: &HashSet<ConnectionId>) -> Vec<ConnectionRef> {
        let mut ids: Vec<ConnectionId> = ids.iter().copied().collect();
        ids.sort_unstable();
        ids.iter()
            .filter_map(|id| self.connections.get(id).cloned())
            .collect()
    }
}

/// Registry of live connections and their topic subscriptions.
pub struct Hub {
    state: RwLock<State>,
    bus: Bus,
}

impl Hub {
    /// Creates an empty hub publishing membership events to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            state: RwLock::new(State::default()),
            bus,
        }
    }

    /// Registers a connection. Returns `false` if the id was already present
    /// (the handle is replaced, subscriptions are kept).
    pub async fn add_connection(&self, conn: ConnectionRef) -> bool {
        let id = conn.id();
        let fresh = self.state.write().await.connections.insert(id, conn).is_none();
        if fresh {
            self.bus
                .publish(Event::new(EventKind::ConnectionAdded).with_connection(id));
        }
        fresh
    }

    /// Deregisters a connection and purges it from every topic set.
    ///
    /// Returns `false` if the connection was not registered.
    pub async fn remove_connection(&self, id: ConnectionId) -> bool {
        let purged = {
            let mut state = self.state.write().await;
            if state.connections.remove(&id).is_none() {
                return false;
            }
            state
                .topics
                .values_mut()
                .map(|members| members.remove(&id))
                .filter(|removed| *removed)
                .count()
        };

        self.bus.publish(
            Event::new(EventKind::ConnectionRemoved)
                .with_connection(id)
                .with_count(purged as u64),
        );
        true
    }

    /// Subscribes a registered connection to `topic`, creating the topic set if needed.
    pub async fn subscribe(&self, id: ConnectionId, topic: Topic) -> Result<(), HubError> {
        {
            let mut state = self.state.write().await;
            if !state.connections.contains_key(&id) {
                return Err(HubError::UnknownConnection {
                    id,
                    topic: topic.to_string(),
                });
            }
            state.topics.entry(topic.clone()).or_default().insert(id);
        }

        self.bus.publish(
            Event::new(EventKind::Subscribed)
                .with_connection(id)
                .with_topic(&topic),
        );
        Ok(())
    }

    /// Removes `id` from `topic`. Unknown topics and non-members are a no-op
    /// (returns `false`).
    pub async fn unsubscribe(&self, id: ConnectionId, topic: &Topic) -> bool {
        let removed = self
            .state
            .write()
            .await
            .topics
            .get_mut(topic)
            .is_some_and(|members| members.remove(&id));

        if removed {
            self.bus.publish(
                Event::new(EventKind::Unsubscribed)
                    .with_connection(id)
                    .with_topic(topic),
            );
        }
        removed
    }

    /// Point-in-time snapshot of the connections subscribed to `topic`
    /// (sorted by id; empty for unknown topics).
    pub async fn subscribers(&self, topic: &Topic) -> Vec<ConnectionRef> {
        let state = self.state.read().await;
        match state.topics.get(topic) {
            Some(ids) => state.resolve(ids),
            None => Vec::new(),
        }
    }

    /// Number of connections currently subscribed to `topic`.
    pub async fn subscriber_count(&self, topic: &Topic) -> usize {
        self.state
            .read()
            .await
            .topics
            .get(topic)
            .map_or(0, HashSet::len)
    }

    /// Snapshot of every live connection (sorted by id).
    pub async fn connections(&self) -> Vec<ConnectionRef> {
        let state = self.state.read().await;
        let mut conns: Vec<ConnectionRef> = state.connections.values().cloned().collect();
        conns.sort_unstable_by_key(|c| c.id());
        conns
    }

    /// Returns sorted list of topics `id` is subscribed to.
    pub async fn topics_of(&self, id: ConnectionId) -> Vec<Topic> {
        let state = self.state.read().await;
        let mut topics: Vec<Topic> = state
            .topics
            .iter()
            .filter(|(_, members)| members.contains(&id))
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort_unstable();
        topics
    }

    /// True if `id` is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.state.read().await.connections.contains_key(&id)
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// True if there are no live connections.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{ChannelConnection, Connection};

    fn hub() -> Hub {
        Hub::new(Bus::new(64))
    }

    fn ids(conns: &[ConnectionRef]) -> Vec<ConnectionId> {
        conns.iter().map(|c| c.id()).collect()
    }

    #[tokio::test]
    async fn test_subscribe_unknown_connection_is_an_error() {
        let hub = hub();
        let err = hub
            .subscribe(ConnectionId::new(99), Topic::new("beer"))
            .await
            .unwrap_err();

        assert!(matches!(err, HubError::UnknownConnection { .. }));
        assert_eq!(hub.subscriber_count(&Topic::new("beer")).await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_and_snapshot() {
        let hub = hub();
        let (a, _ra) = ChannelConnection::channel(4);
        let (b, _rb) = ChannelConnection::channel(4);
        hub.add_connection(a.clone()).await;
        hub.add_connection(b.clone()).await;

        hub.subscribe(a.id(), Topic::new("beer")).await.unwrap();
        hub.subscribe(b.id(), Topic::new("beer")).await.unwrap();
        hub.subscribe(b.id(), Topic::new("wine")).await.unwrap();

        let mut expected = vec![a.id(), b.id()];
        expected.sort_unstable();
        assert_eq!(ids(&hub.subscribers(&Topic::new("beer")).await), expected);
        assert_eq!(ids(&hub.subscribers(&Topic::new("wine")).await), [b.id()]);
    }

    #[tokio::test]
    async fn test_unknown_topic_has_no_subscribers() {
        let hub = hub();
        assert!(hub.subscribers(&Topic::new("nothing")).await.is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_excludes_connection() {
        let hub = hub();
        let (a, _ra) = ChannelConnection::channel(4);
        hub.add_connection(a.clone()).await;
        hub.subscribe(a.id(), Topic::new("beer")).await.unwrap();

        assert!(hub.unsubscribe(a.id(), &Topic::new("beer")).await);
        assert!(hub.subscribers(&Topic::new("beer")).await.is_empty());
        // Second unsubscribe and unknown topic are no-ops.
        assert!(!hub.unsubscribe(a.id(), &Topic::new("beer")).await);
        assert!(!hub.unsubscribe(a.id(), &Topic::new("nothing")).await);
    }

    #[tokio::test]
    async fn test_remove_connection_purges_every_topic() {
        let hub = hub();
        let (a, _ra) = ChannelConnection::channel(4);
        let (b, _rb) = ChannelConnection::channel(4);
        hub.add_connection(a.clone()).await;
        hub.add_connection(b.clone()).await;
        for topic in ["beer", "wine", "cider"] {
            hub.subscribe(a.id(), Topic::new(topic)).await.unwrap();
        }
        hub.subscribe(b.id(), Topic::new("beer")).await.unwrap();

        assert!(hub.remove_connection(a.id()).await);

        assert!(!hub.contains(a.id()).await);
        assert!(hub.topics_of(a.id()).await.is_empty());
        assert_eq!(ids(&hub.subscribers(&Topic::new("beer")).await), [b.id()]);
        assert!(hub.subscribers(&Topic::new("wine")).await.is_empty());
        assert!(!hub.remove_connection(a.id()).await);
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_of_later_changes() {
        let hub = hub();
        let (a, _ra) = ChannelConnection::channel(4);
        hub.add_connection(a.clone()).await;
        hub.subscribe(a.id(), Topic::new("beer")).await.unwrap();

        let snapshot = hub.subscribers(&Topic::new("beer")).await;
        hub.remove_connection(a.id()).await;

        assert_eq!(ids(&snapshot), [a.id()]);
        assert!(hub.subscribers(&Topic::new("beer")).await.is_empty());
    }

    #[tokio::test]
    async fn test_membership_events_are_published() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let hub = Hub::new(bus);
        let (a, _ra) = ChannelConnection::channel(4);

        hub.add_connection(a.clone()).await;
        hub.subscribe(a.id(), Topic::new("beer")).await.unwrap();
        hub.remove_connection(a.id()).await;

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ConnectionAdded);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::Subscribed);
        let removed = rx.recv().await.unwrap();
        assert_eq!(removed.kind, EventKind::ConnectionRemoved);
        assert_eq!(removed.count, Some(1));
    }
}
