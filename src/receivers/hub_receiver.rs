//! # HubReceiver: routes new items to the delivery hub.
//!
//! ```text
//! poll task ──► HubReceiver::receive(item, source)
//!                 ├─► hub.subscribers(Topic::from(source.id()))   (snapshot)
//!                 ├─► join_all(conn.send(&Delivery))               (best-effort, concurrent)
//!                 ├─► failed send → publish DeliveryFailed, keep going
//!                 └─► hub.remove_connection(failed ids)
//! ```
//!
//! A failing subscriber never prevents delivery to the others.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::events::{Bus, Event, EventKind};
use crate::hub::{ConnectionId, Delivery, Hub, Topic};
use crate::receivers::receive::Receive;
use crate::sources::{Item, SourceId, WatchedSource};

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Number of subscribers that accepted the item.
    pub delivered: usize,
    /// Subscribers whose send failed (removed from the hub afterwards).
    pub failed: Vec<ConnectionId>,
}

/// Receiver that fans each item out to the subscribers of its source's topic.
pub struct HubReceiver {
    hub: Arc<Hub>,
    bus: Bus,
}

impl HubReceiver {
    /// Creates a receiver delivering through `hub`.
    pub fn new(hub: Arc<Hub>, bus: Bus) -> Self {
        Self { hub, bus }
    }

    /// Delivers `item` to every connection subscribed to `source`'s topic.
    pub async fn fan_out(&self, item: &Item, source: &SourceId) -> FanOut {
        let topic = Topic::from(source);
        let subscribers = self.hub.subscribers(&topic).await;
        if subscribers.is_empty() {
            return FanOut::default();
        }

        let delivery = Delivery::new(topic.clone(), item.clone());
        let delivery = &delivery;
        let results = join_all(
            subscribers
                .iter()
                .map(|conn| async move { (conn.id(), conn.send(delivery).await) }),
        )
        .await;

        let mut report = FanOut::default();
        for (id, res) in results {
            match res {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    self.bus.publish(
                        Event::new(EventKind::DeliveryFailed)
                            .with_connection(id)
                            .with_topic(&topic)
                            .with_item_key(&item.key)
                            .with_reason(e.to_string()),
                    );
                    report.failed.push(id);
                }
            }
        }

        for id in &report.failed {
            self.hub.remove_connection(*id).await;
        }
        report
    }
}

#[async_trait]
impl Receive for HubReceiver {
    async fn receive(&self, item: &Item, source: &dyn WatchedSource) {
        self.fan_out(item, source.id()).await;
    }
}
