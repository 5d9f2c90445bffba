//! # Channel-backed connection.
//!
//! [`ChannelConnection`] adapts any transport to the hub: deliveries are pushed
//! into a bounded `mpsc` queue with `try_send`, and the transport drains the
//! receiving half (encoding and writing each [`Delivery`] to its socket).
//!
//! ```text
//! Hub fan-out ──► ChannelConnection::send ──try_send──► [bounded queue] ──► transport writer
//!                        ├─ Full   → DeliveryError::Full   (item dropped)
//!                        └─ Closed → DeliveryError::Closed (writer gone)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::hub::connection::{Connection, ConnectionId, Delivery};

/// Connection whose outbound side is a bounded `mpsc` queue.
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    tx: mpsc::Sender<Delivery>,
}

impl ChannelConnection {
    /// Creates a connection with a fresh id and a queue of `capacity` (min 1).
    ///
    /// Returns the connection and the receiving half for the transport writer.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Delivery>) {
        Self::with_id(ConnectionId::next(), capacity)
    }

    /// Same as [`ChannelConnection::channel`] with a transport-chosen id.
    pub fn with_id(id: ConnectionId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self { id, tx }), rx)
    }
}

#[async_trait]
impl Connection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, delivery: &Delivery) -> Result<(), DeliveryError> {
        self.tx.try_send(delivery.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::Topic;
    use crate::sources::Item;

    fn delivery(key: &str) -> Delivery {
        Delivery::new(Topic::new("beer"), Item::new(key, serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_send_reaches_receiver() {
        let (conn, mut rx) = ChannelConnection::channel(4);
        conn.send(&delivery("1")).await.unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.item.key, "1");
        assert_eq!(got.topic.as_str(), "beer");
    }

    #[tokio::test]
    async fn test_full_queue_reports_full() {
        let (conn, _rx) = ChannelConnection::channel(1);
        conn.send(&delivery("1")).await.unwrap();

        assert_eq!(conn.send(&delivery("2")).await, Err(DeliveryError::Full));
    }

    #[tokio::test]
    async fn test_dropped_receiver_reports_closed() {
        let (conn, rx) = ChannelConnection::channel(4);
        drop(rx);

        assert_eq!(conn.send(&delivery("1")).await, Err(DeliveryError::Closed));
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = ChannelConnection::channel(1);
        let (b, _rb) = ChannelConnection::channel(1);
        assert_ne!(a.id(), b.id());
    }
}
