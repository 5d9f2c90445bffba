//! # watchhub
//!
//! **watchhub** polls remote sources on a fixed interval, keeps only the items
//! it has not delivered before, and fans them out to every live connection
//! subscribed to that source's topic.
//!
//! It is the plumbing behind a "watch this hashtag" service: clients send
//! `watch`/`unwatch` commands over their connection, the scheduler keeps exactly
//! one poll task per source no matter how many clients asked for it, and the hub
//! pushes each new item to the clients that are interested.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   client conn #1      client conn #2      client conn #3
//!        │  ▲                │  ▲                │  ▲
//!  command  │ Delivery  command  │ Delivery  command  │ Delivery
//!        ▼  │                ▼  │                ▼  │
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Endpoint  (decode → hub.subscribe / scheduler.watch)             │
//! └──────┬────────────────────────────────────────────┬───────────────┘
//!        ▼                                            ▼
//! ┌───────────────────────────┐        ┌───────────────────────────────┐
//! │ Scheduler                 │        │ Hub                           │
//! │ - Registry (id → task)    │        │ - connections (id → conn)     │
//! │ - DedupTracker (id → mark)│        │ - topics (topic → {conn ids}) │
//! └──────┬────────────────────┘        └───────────────▲───────────────┘
//!        ▼                                             │ snapshot + send
//!   ┌──────────┐  ┌──────────┐                  ┌──────┴───────┐
//!   │PollActor │  │PollActor │ ── new items ──► │ HubReceiver  │
//!   │ "beer"   │  │ "wine"   │                  │  (fan-out)   │
//!   └──────────┘  └──────────┘                  └──────────────┘
//!        │ publish(Event)
//!        ▼
//!   Bus (broadcast) ──► SubscriberSet ──► LogWriter / metrics / ...
//! ```
//!
//! ### Poll lifecycle
//! ```text
//! Scheduler::watch(source) ──► PollActor::run()
//!
//! loop {
//!   ├─► cancelled? → exit
//!   ├─► fetch() (raced against cancellation)
//!   │       ├─ Err ──► FetchFailed, treat as empty batch
//!   │       └─ Ok  ──► sort by key → admit(key) > mark ? receive : skip
//!   └─► sleep(jitter(interval)) (cancellable)
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Sources**       | What to poll and how often.                                    | [`WatchedSource`], [`HashtagSource`], [`SourceFn`] |
//! | **Scheduling**    | One poll task per identifier, graceful shutdown.               | [`Scheduler`], [`Runtime`]                  |
//! | **Deduplication** | Per-source lexical high-water-mark.                            | [`DedupTracker`]                            |
//! | **Delivery**      | Topic subscriptions and best-effort fan-out.                   | [`Hub`], [`Connection`], [`HubReceiver`]    |
//! | **Commands**      | JSON watch/unwatch protocol.                                   | [`Endpoint`], [`Command`]                   |
//! | **Observability** | Typed events and isolated subscribers.                         | [`Event`], [`Subscribe`]                    |
//! | **Errors**        | Typed, never fatal.                                            | [`FetchError`], [`CommandError`], ...       |
//! | **Configuration** | Centralized runtime settings.                                  | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` _(default)_: exports [`LogWriter`], which renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use watchhub::{Config, FetchError, Item, Runtime, SourceFn, SourceRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn watchhub::Subscribe>> = vec![Arc::new(watchhub::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn watchhub::Subscribe>> = Vec::new();
//!
//!     let runtime = Runtime::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let endpoint = runtime.endpoint(Arc::new(|slug: &str| -> SourceRef {
//!         SourceFn::arc(slug, Duration::from_secs(2), || async {
//!             Ok::<_, FetchError>(vec![Item::new("1", serde_json::json!({ "caption": "stout" }))])
//!         })
//!     }));
//!
//!     let (conn, mut deliveries) = endpoint.open_channel().await;
//!     endpoint.handle(conn, br#"{"command":"watch","hashtag":"beer"}"#).await?;
//!
//!     let delivery = deliveries.recv().await.expect("first item");
//!     assert_eq!(delivery.item.key, "1");
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod endpoint;
mod error;
mod events;
mod hub;
mod policies;
mod receivers;
mod sources;
pub mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{Config, Runtime, RuntimeBuilder, Scheduler, UnwatchOutcome, WatchOutcome};
pub use endpoint::{Command, CommandKind, CommandOutcome, Endpoint, SourceFactory};
pub use error::{CommandError, DeliveryError, FetchError, HubError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use hub::{ChannelConnection, Connection, ConnectionId, ConnectionRef, Delivery, Hub, Topic};
pub use policies::JitterPolicy;
pub use receivers::{FanOut, HubReceiver, Receive, ReceiverRef};
pub use sources::{
    DedupTracker, FetchMedia, HashtagSource, Item, SourceFn, SourceId, SourceRef, WatchedSource,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: built-in subscriber that renders events through `tracing`.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
