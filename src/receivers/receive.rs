//! # Result receiver trait.
//!
//! The poll task of a source hands every newly admitted item to a [`Receive`]
//! implementation.
//!
//! ## Rules
//! - Called only from the poll task of `source`: calls for one source are
//!   strictly sequential and in increasing key order.
//! - Calls for different sources may run concurrently.
//! - Must not panic and should not block for long: a slow receiver delays the
//!   next poll cycle of that source (and only that source).

use std::sync::Arc;

use async_trait::async_trait;

use crate::sources::{Item, WatchedSource};

/// Consumer of newly observed items.
#[async_trait]
pub trait Receive: Send + Sync + 'static {
    /// Handles one new item observed on `source`.
    async fn receive(&self, item: &Item, source: &dyn WatchedSource);
}

/// Shared handle to a receiver.
pub type ReceiverRef = Arc<dyn Receive>;
