//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for observing the runtime: logging,
//! metrics, audit trails of watch/unwatch commands, delivery failure alerts.
//!
//! Each subscriber gets its own bounded queue and worker task inside the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet):
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                    └─► panic caught → EventKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only fills its own queue; poll tasks never wait for it.
//! - On a full queue the event is dropped **for this subscriber only** and
//!   `EventKind::SubscriberOverflow` is published.
//! - Events reach one subscriber in publish order (FIFO).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use watchhub::{Event, EventKind, Subscribe};
//!
//! struct DeliveryAlerts;
//!
//! #[async_trait]
//! impl Subscribe for DeliveryAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::DeliveryFailed) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "delivery-alerts" }
//!     fn queue_capacity(&self) -> usize { 128 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// Implementations should use async I/O and handle their own errors; a panic
/// is caught and reported as `SubscriberPanicked`, and the worker moves on to
/// the next event.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, off the publisher's path.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    ///
    /// Defaults to `type_name::<Self>()`; override with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this subscriber (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
