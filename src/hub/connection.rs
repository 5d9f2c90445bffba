//! # Connection handles and hub topics.
//!
//! The transport owns the real duplex channel; the hub only sees a
//! [`Connection`]: an id plus a best-effort async [`send`](Connection::send).

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;
use crate::sources::{Item, SourceId};

/// Global counter backing [`ConnectionId::next`].
static CONNECTION_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of a live connection inside the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id chosen by the transport.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(CONNECTION_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Fan-out channel name.
///
/// Topics share the source-identifier namespace: one topic per watched source,
/// obtained with `Topic::from(&source_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(Arc<str>);

impl Topic {
    /// Creates a topic from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&SourceId> for Topic {
    fn from(id: &SourceId) -> Self {
        Self::new(id.as_str())
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured outbound message: one item on one topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    /// Topic the item was published on.
    pub topic: Topic,
    /// The new item.
    pub item: Item,
}

impl Delivery {
    /// Creates a delivery.
    pub fn new(topic: Topic, item: Item) -> Self {
        Self { topic, item }
    }
}

/// # Live duplex channel to one consumer, as seen by the hub.
///
/// ### Implementation requirements
/// - `id` must be stable for the lifetime of the connection.
/// - `send` is best-effort: return an error instead of waiting on a slow or
///   dead consumer. The hub removes connections whose send fails.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Returns the connection's identity.
    fn id(&self) -> ConnectionId;

    /// Writes one delivery to the consumer.
    async fn send(&self, delivery: &Delivery) -> Result<(), DeliveryError>;
}

/// Shared handle to a connection.
pub type ConnectionRef = Arc<dyn Connection>;
