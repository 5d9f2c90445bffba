//! # Topic-based delivery hub.
//!
//! - [`Hub`] - live connections and topic subscription sets
//! - [`Connection`] / [`ConnectionRef`] - the hub's view of a consumer channel
//! - [`ChannelConnection`] - `mpsc`-backed connection for any transport
//! - [`ConnectionId`], [`Topic`], [`Delivery`] - identity and message types

mod channel;
mod connection;
#[allow(clippy::module_inception)]
mod hub;

pub use channel::ChannelConnection;
pub use connection::{Connection, ConnectionId, ConnectionRef, Delivery, Topic};
pub use hub::Hub;
