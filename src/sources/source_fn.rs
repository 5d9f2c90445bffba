//! # Function-backed source (`SourceFn`)
//!
//! [`SourceFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh fetch
//! future per poll cycle. If the closure needs state across cycles, capture an
//! `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use watchhub::{FetchError, Item, SourceFn, SourceRef, WatchedSource};
//!
//! let s: SourceRef = SourceFn::arc("beer", Duration::from_secs(2), || async {
//!     Ok::<_, FetchError>(vec![Item::new("1", serde_json::Value::Null)])
//! });
//!
//! assert_eq!(s.id().as_str(), "beer");
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::sources::source::{Item, SourceId, WatchedSource};

/// Function-backed source implementation.
pub struct SourceFn<F> {
    id: SourceId,
    interval: Duration,
    f: F,
}

impl<F> SourceFn<F> {
    /// Creates a new function-backed source.
    pub fn new(id: impl Into<SourceId>, interval: Duration, f: F) -> Self {
        Self {
            id: id.into(),
            interval,
            f,
        }
    }

    /// Creates the source and returns it as a shared handle.
    pub fn arc(id: impl Into<SourceId>, interval: Duration, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, interval, f))
    }
}

#[async_trait]
impl<F, Fut> WatchedSource for SourceFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Item>, FetchError>> + Send + 'static,
{
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        (self.f)().await
    }
}
