//! # Result receivers.
//!
//! - [`Receive`] / [`ReceiverRef`] - consumer of new items, called by poll tasks
//! - [`HubReceiver`] - routes items to the [`Hub`](crate::Hub) fan-out
//! - [`FanOut`] - per-item delivery report

mod hub_receiver;
mod receive;

pub use hub_receiver::{FanOut, HubReceiver};
pub use receive::{Receive, ReceiverRef};
