//! # LogWriter: renders runtime events as `tracing` records.
//!
//! Each event becomes one record with structured fields; installing a
//! `tracing` subscriber (fmt, json, ...) is up to the host application.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  watchhub: source watched source="beer" interest=1
//! DEBUG watchhub: item emitted source="beer" cycle=1 key="1714412345_17"
//! WARN  watchhub: fetch failed source="beer" cycle=4 reason="source unavailable: 503"
//! WARN  watchhub: delivery failed connection=conn-3 topic="beer" reason="connection closed"
//! INFO  watchhub: shutdown requested
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let source = e.source.as_deref().unwrap_or("-");
        let topic = e.topic.as_deref().unwrap_or("-");
        let key = e.item_key.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        let connection = e.connection.map(|c| c.to_string()).unwrap_or_default();

        match e.kind {
            EventKind::SubscriberPanicked => {
                error!(seq = e.seq, subscriber = e.subscriber, reason, "subscriber panicked")
            }
            EventKind::SubscriberOverflow => {
                warn!(seq = e.seq, subscriber = e.subscriber, reason, "subscriber overflow")
            }
            EventKind::SourceWatched => {
                info!(seq = e.seq, source, interest = e.count, "source watched")
            }
            EventKind::WatchJoined => {
                debug!(seq = e.seq, source, interest = e.count, "watch joined running task")
            }
            EventKind::SourceUnwatched => info!(seq = e.seq, source, "source unwatched"),
            EventKind::UnwatchIgnored => debug!(seq = e.seq, source, "unwatch of unknown source"),
            EventKind::PollStarting => debug!(seq = e.seq, source, cycle = e.cycle, "poll starting"),
            EventKind::FetchFailed => {
                warn!(seq = e.seq, source, cycle = e.cycle, reason, "fetch failed")
            }
            EventKind::ItemEmitted => {
                debug!(seq = e.seq, source, cycle = e.cycle, key, "item emitted")
            }
            EventKind::ItemSkipped => {
                debug!(seq = e.seq, source, cycle = e.cycle, key, "item skipped")
            }
            EventKind::PollIdle => debug!(
                seq = e.seq,
                source,
                cycle = e.cycle,
                emitted = e.count,
                delay_ms = e.delay_ms,
                "poll idle"
            ),
            EventKind::PollStopped => info!(seq = e.seq, source, cycle = e.cycle, "poll stopped"),
            EventKind::PollDead => error!(seq = e.seq, source, reason, "poll task died"),
            EventKind::ConnectionAdded => info!(seq = e.seq, %connection, "connection added"),
            EventKind::ConnectionRemoved => {
                info!(seq = e.seq, %connection, topics = e.count, "connection removed")
            }
            EventKind::Subscribed => debug!(seq = e.seq, %connection, topic, "subscribed"),
            EventKind::Unsubscribed => debug!(seq = e.seq, %connection, topic, "unsubscribed"),
            EventKind::DeliveryFailed => {
                warn!(seq = e.seq, %connection, topic, key, reason, "delivery failed")
            }
            EventKind::CommandRejected => {
                warn!(seq = e.seq, %connection, reason, "command rejected")
            }
            EventKind::ShutdownRequested => info!(seq = e.seq, "shutdown requested"),
            EventKind::AllStoppedWithin => info!(seq = e.seq, "all poll tasks stopped within grace"),
            EventKind::GraceExceeded => {
                error!(seq = e.seq, stuck = reason, "shutdown grace exceeded")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
