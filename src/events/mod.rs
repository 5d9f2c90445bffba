//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler`, `PollActor`, `runner::run_cycle`, `Hub`,
//!   `HubReceiver`, `Endpoint`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's event listener (fans out to `SubscriberSet`),
//!   plus any receiver obtained from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
