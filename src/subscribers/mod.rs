//! # Event subscribers.
//!
//! Everything the runtime does is published on the [`Bus`](crate::events::Bus);
//! subscribers observe it without slowing down poll tasks or deliveries.
//!
//! ```text
//! PollActor / Hub / Endpoint ── publish(Event) ──► Bus ──► Runtime listener
//!                                                              │
//!                                                   SubscriberSet::emit(&Event)
//!                                                    ┌─────────┼─────────┐
//!                                                    ▼         ▼         ▼
//!                                                LogWriter  Metrics   Custom
//! ```
//!
//! - [`Subscribe`]: the trait to implement
//! - [`SubscriberSet`]: per-subscriber queues with panic isolation
//! - [`embedded`]: built-in subscribers

pub mod embedded;
mod subscriber;
mod subscriber_set;

pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
