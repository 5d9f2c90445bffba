//! # Endpoint: applies client commands to the hub and the scheduler.
//!
//! ```text
//! transport frame ──► Endpoint::handle(conn, payload)
//!                        ├─► Command::decode          ── Err → CommandRejected (connection kept)
//!                        ├─► factory(slug) → source
//!                        ├─ watch:   hub.subscribe(conn, topic)?  then scheduler.watch(source)?
//!                        └─ unwatch: hub.unsubscribe(conn, topic) then scheduler.unwatch(id)
//! ```
//!
//! The topic is always derived from the source identifier, so a client that
//! sends `#Beer` and one that sends `beer` share one topic and one poll task.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::{Scheduler, UnwatchOutcome, WatchOutcome};
use crate::endpoint::command::{Command, CommandKind};
use crate::error::CommandError;
use crate::events::{Bus, Event, EventKind};
use crate::hub::{
    ChannelConnection, Connection, ConnectionId, ConnectionRef, Delivery, Hub, Topic,
};
use crate::sources::{SourceId, SourceRef};

/// Builds the watched source for a client slug.
pub type SourceFactory = Arc<dyn Fn(&str) -> SourceRef + Send + Sync>;

/// Effect of an accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Connection subscribed; `started` is false when the source was already polled.
    Watching {
        /// Identifier of the watched source.
        source: SourceId,
        /// Whether this command spawned the poll task.
        started: bool,
    },
    /// Connection unsubscribed; `stopped` is false when nothing was polled.
    Unwatched {
        /// Identifier of the source.
        source: SourceId,
        /// Whether a poll task was stopped.
        stopped: bool,
    },
}

/// Entry point for client connections and their commands.
pub struct Endpoint {
    hub: Arc<Hub>,
    scheduler: Arc<Scheduler>,
    factory: SourceFactory,
    bus: Bus,
    connection_capacity: usize,
}

impl Endpoint {
    /// Creates an endpoint over `hub` and `scheduler`.
    pub fn new(hub: Arc<Hub>, scheduler: Arc<Scheduler>, factory: SourceFactory) -> Self {
        let bus = scheduler.bus().clone();
        Self {
            hub,
            scheduler,
            factory,
            bus,
            connection_capacity: 64,
        }
    }

    /// Sets the queue size of connections opened with [`open_channel`](Self::open_channel).
    pub fn with_connection_capacity(mut self, capacity: usize) -> Self {
        self.connection_capacity = capacity.max(1);
        self
    }

    /// Registers a transport connection.
    pub async fn connect(&self, conn: ConnectionRef) -> bool {
        self.hub.add_connection(conn).await
    }

    /// Opens a channel-backed connection and registers it.
    ///
    /// The transport writes every [`Delivery`] read from the receiver to its client.
    pub async fn open_channel(&self) -> (ConnectionId, mpsc::Receiver<Delivery>) {
        let (conn, rx) = ChannelConnection::channel(self.connection_capacity);
        let id = conn.id();
        self.hub.add_connection(conn).await;
        (id, rx)
    }

    /// Forgets a connection after its transport closed.
    ///
    /// Poll tasks keep running; other subscribers may still be interested.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        self.hub.remove_connection(id).await
    }

    /// Decodes and applies one inbound command from `id`.
    ///
    /// # Errors
    /// Any [`CommandError`]; the command is dropped, a `CommandRejected` event
    /// is published and the connection stays registered.
    pub async fn handle(
        &self,
        id: ConnectionId,
        payload: &[u8],
    ) -> Result<CommandOutcome, CommandError> {
        let res = match Command::decode(payload) {
            Ok(cmd) => self.apply(id, cmd).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &res {
            self.bus.publish(
                Event::new(EventKind::CommandRejected)
                    .with_connection(id)
                    .with_reason(format!("{}: {e}", e.as_label())),
            );
        }
        res
    }

    /// Applies an already decoded command.
    pub async fn apply(
        &self,
        id: ConnectionId,
        cmd: Command,
    ) -> Result<CommandOutcome, CommandError> {
        let source = (self.factory)(&cmd.slug);
        let sid = source.id().clone();
        let topic = Topic::from(&sid);

        match cmd.kind {
            CommandKind::Watch => {
                self.hub.subscribe(id, topic).await?;
                let started = self.scheduler.watch(source).await? == WatchOutcome::Started;
                Ok(CommandOutcome::Watching {
                    source: sid,
                    started,
                })
            }
            CommandKind::Unwatch => {
                self.hub.unsubscribe(id, &topic).await;
                let stopped =
                    self.scheduler.unwatch(sid.as_str()).await == UnwatchOutcome::Stopped;
                Ok(CommandOutcome::Unwatched {
                    source: sid,
                    stopped,
                })
            }
        }
    }

    /// Delivery hub behind this endpoint.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Scheduler behind this endpoint.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::Config;
    use crate::error::FetchError;
    use crate::receivers::HubReceiver;
    use crate::sources::{Item, SourceFn};

    fn endpoint() -> Endpoint {
        let bus = Bus::new(256);
        let hub = Arc::new(Hub::new(bus.clone()));
        let receiver = Arc::new(HubReceiver::new(hub.clone(), bus.clone()));
        let scheduler = Scheduler::new(&Config::default(), bus, receiver);
        let factory: SourceFactory = Arc::new(|slug: &str| -> SourceRef {
            SourceFn::arc(slug.trim().to_lowercase(), Duration::from_secs(2), || async {
                let payload = serde_json::json!({ "caption": "ipa" });
                Ok::<_, FetchError>(vec![Item::new("1", payload)])
            })
        });
        Endpoint::new(hub, scheduler, factory)
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_subscribes_and_delivers() {
        let ep = endpoint();
        let (id, mut rx) = ep.open_channel().await;

        let outcome = ep
            .handle(id, br#"{"command":"watch","hashtag":"Beer"}"#)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Watching {
                source: SourceId::new("beer"),
                started: true
            }
        );

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.topic.as_str(), "beer");
        assert_eq!(delivery.item.key, "1");

        ep.scheduler().shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_watcher_joins_running_task() {
        let ep = endpoint();
        let (a, _rx_a) = ep.open_channel().await;
        let (b, _rx_b) = ep.open_channel().await;
        let watch = br#"{"command":"watch","hashtag":"beer"}"#;

        ep.handle(a, watch).await.unwrap();
        let second = ep.handle(b, watch).await.unwrap();

        assert_eq!(
            second,
            CommandOutcome::Watching {
                source: SourceId::new("beer"),
                started: false
            }
        );
        assert_eq!(ep.hub().subscriber_count(&Topic::new("beer")).await, 2);
        assert_eq!(ep.scheduler().interest("beer").await, 2);

        ep.scheduler().shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_command_keeps_connection() {
        let ep = endpoint();
        let mut bus_rx = ep.bus.subscribe();
        let (id, _rx) = ep.open_channel().await;

        for payload in [
            &b"not json"[..],
            br#"{"command":"follow","hashtag":"beer"}"#,
            br#"{"command":"watch"}"#,
        ] {
            assert!(ep.handle(id, payload).await.is_err());
        }

        assert!(ep.hub().contains(id).await);
        assert!(ep.scheduler().list().await.is_empty());

        let mut rejected = 0;
        while let Ok(ev) = bus_rx.try_recv() {
            if ev.kind == EventKind::CommandRejected {
                assert_eq!(ev.connection, Some(id));
                rejected += 1;
            }
        }
        assert_eq!(rejected, 3);
    }

    #[tokio::test]
    async fn test_watch_from_unknown_connection_is_rejected() {
        let ep = endpoint();
        let err = ep
            .handle(ConnectionId::new(u64::MAX), br#"{"command":"watch","hashtag":"beer"}"#)
            .await
            .unwrap_err();

        assert_eq!(err.as_label(), "hub_unknown_connection");
        assert!(!ep.scheduler().is_watched("beer").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwatch_stops_polling_and_unsubscribes() {
        let ep = endpoint();
        let (id, _rx) = ep.open_channel().await;
        ep.handle(id, br#"{"command":"watch","hashtag":"beer"}"#)
            .await
            .unwrap();

        let outcome = ep
            .handle(id, br#"{"command":"unwatch","hashtag":"beer"}"#)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Unwatched {
                source: SourceId::new("beer"),
                stopped: true
            }
        );
        assert!(ep.hub().topics_of(id).await.is_empty());
        assert!(!ep.scheduler().is_watched("beer").await);

        let again = ep
            .handle(id, br#"{"command":"unwatch","hashtag":"beer"}"#)
            .await
            .unwrap();
        assert_eq!(
            again,
            CommandOutcome::Unwatched {
                source: SourceId::new("beer"),
                stopped: false
            }
        );
    }
}
