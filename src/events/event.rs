//! # Runtime events emitted by the scheduler, poll tasks, hub and endpoint.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **Scheduler events**: watch/unwatch requests and their outcome
//! - **Poll events**: per-cycle flow of one poll task (fetch, emit, skip, stop)
//! - **Hub events**: connection membership and delivery failures
//! - **Runtime events**: subscriber health and shutdown
//!
//! The [`Event`] struct carries optional metadata such as the source identifier,
//! topic, connection, item key, cycle number and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use watchhub::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::FetchFailed)
//!     .with_source("beer")
//!     .with_cycle(3)
//!     .with_reason("source unavailable: 503");
//!
//! assert_eq!(ev.kind, EventKind::FetchFailed);
//! assert_eq!(ev.source.as_deref(), Some("beer"));
//! assert_eq!(ev.cycle, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::hub::ConnectionId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `subscriber`, `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `subscriber`, `reason` ("full" / "closed").
    SubscriberOverflow,

    // === Scheduler events ===
    /// A new poll task was spawned for a source.
    ///
    /// Sets: `source`, `count` (interest after this watch).
    SourceWatched,

    /// Watch on an already running source; only the interest counter changed.
    ///
    /// Sets: `source`, `count` (interest after this watch).
    WatchJoined,

    /// Cancellation was requested for a source's poll task.
    ///
    /// Sets: `source`.
    SourceUnwatched,

    /// Unwatch for a source that has no poll task (harmless no-op).
    ///
    /// Sets: `source`.
    UnwatchIgnored,

    // === Poll events ===
    /// A poll cycle is starting (fetch is about to be called).
    ///
    /// Sets: `source`, `cycle`.
    PollStarting,

    /// Fetch failed; the cycle is treated as empty.
    ///
    /// Sets: `source`, `cycle`, `reason`.
    FetchFailed,

    /// A new item passed the high-water-mark and was handed to the receiver.
    ///
    /// Sets: `source`, `cycle`, `item_key`.
    ItemEmitted,

    /// An item was at or below the high-water-mark and was discarded.
    ///
    /// Sets: `source`, `cycle`, `item_key`.
    ItemSkipped,

    /// A poll cycle finished and the task is going to sleep.
    ///
    /// Sets: `source`, `cycle`, `count` (items emitted), `delay_ms`.
    PollIdle,

    /// The poll task exited after observing cancellation.
    ///
    /// Sets: `source`, `cycle` (last completed cycle).
    PollStopped,

    /// The poll task terminated abnormally (panicked in a collaborator).
    ///
    /// Sets: `source`, `reason`.
    PollDead,

    // === Hub events ===
    /// Connection registered with the hub.
    ///
    /// Sets: `connection`.
    ConnectionAdded,

    /// Connection removed from the hub and every topic set.
    ///
    /// Sets: `connection`, `count` (topics it was purged from).
    ConnectionRemoved,

    /// Connection subscribed to a topic.
    ///
    /// Sets: `connection`, `topic`.
    Subscribed,

    /// Connection unsubscribed from a topic.
    ///
    /// Sets: `connection`, `topic`.
    Unsubscribed,

    /// Writing an item to one subscriber failed; the connection will be removed.
    ///
    /// Sets: `connection`, `topic`, `item_key`, `reason`.
    DeliveryFailed,

    // === Endpoint events ===
    /// An inbound command was rejected; the connection stays open.
    ///
    /// Sets: `connection`, `reason`.
    CommandRejected,

    // === Shutdown events ===
    /// Shutdown requested.
    ShutdownRequested,

    /// All poll tasks stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some poll tasks did not stop in time.
    ///
    /// Sets: `reason` (stuck sources).
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Watched source identifier, if applicable.
    pub source: Option<Arc<str>>,
    /// Hub topic, if applicable.
    pub topic: Option<Arc<str>>,
    /// Hub connection, if applicable.
    pub connection: Option<ConnectionId>,
    /// Key of the item concerned.
    pub item_key: Option<Arc<str>>,
    /// Poll cycle number (starting from 1, per task).
    pub cycle: Option<u64>,
    /// Kind-specific counter (interest, emitted items, purged topics).
    pub count: Option<u64>,
    /// Sleep before the next poll cycle in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Name of the subscriber for subscriber health events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            topic: None,
            connection: None,
            item_key: None,
            cycle: None,
            count: None,
            delay_ms: None,
            reason: None,
            subscriber: None,
        }
    }

    /// Attaches a source identifier.
    #[inline]
    pub fn with_source(mut self, source: impl AsRef<str>) -> Self {
        self.source = Some(Arc::from(source.as_ref()));
        self
    }

    /// Attaches a hub topic.
    #[inline]
    pub fn with_topic(mut self, topic: impl AsRef<str>) -> Self {
        self.topic = Some(Arc::from(topic.as_ref()));
        self
    }

    /// Attaches a connection id.
    #[inline]
    pub fn with_connection(mut self, id: ConnectionId) -> Self {
        self.connection = Some(id);
        self
    }

    /// Attaches an item key.
    #[inline]
    pub fn with_item_key(mut self, key: impl AsRef<str>) -> Self {
        self.item_key = Some(Arc::from(key.as_ref()));
        self
    }

    /// Attaches a poll cycle number.
    #[inline]
    pub fn with_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Attaches a kind-specific counter.
    #[inline]
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Attaches the delay before the next cycle (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Returns true for `SubscriberOverflow` events.
    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
