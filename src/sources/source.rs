//! # Watched source abstraction.
//!
//! A [`WatchedSource`] has a stable [`id`](WatchedSource::id), a poll
//! [`interval`](WatchedSource::interval) and an async [`fetch`](WatchedSource::fetch)
//! that returns the items currently visible upstream. The scheduler is
//! source-agnostic: it only ever talks to `Arc<dyn WatchedSource>` ([`SourceRef`]).

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Stable identifier of a watched source.
///
/// Used as the scheduler's task key and, through
/// [`Topic::from`](crate::Topic), as the hub topic name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Arc<str>);

impl SourceId {
    /// Creates an identifier from any string-like value.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// One item observed on a watched source.
///
/// `key` orders items within a source and is compared lexically; `payload`
/// is forwarded to subscribers untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque, lexically comparable key (e.g. the upstream media id).
    pub key: String,
    /// Item body as delivered to consumers.
    pub payload: serde_json::Value,
}

impl Item {
    /// Creates an item.
    pub fn new(key: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }
}

/// # Pollable external data source.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use watchhub::{FetchError, Item, SourceId, WatchedSource};
///
/// struct Static(SourceId);
///
/// #[async_trait]
/// impl WatchedSource for Static {
///     fn id(&self) -> &SourceId { &self.0 }
///     fn interval(&self) -> Duration { Duration::from_secs(2) }
///
///     async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
///         Ok(vec![Item::new("1", serde_json::json!({"caption": "hello"}))])
///     }
/// }
/// ```
#[async_trait]
pub trait WatchedSource: Send + Sync + 'static {
    /// Returns the stable identifier. Identical configuration must yield the same id.
    fn id(&self) -> &SourceId;

    /// Returns the sleep between two poll cycles.
    fn interval(&self) -> Duration;

    /// Returns the items currently available upstream.
    ///
    /// Items should come in ascending key order; the poll loop sorts defensively
    /// before deduplication anyway. Errors are treated as an empty batch.
    async fn fetch(&self) -> Result<Vec<Item>, FetchError>;
}

/// Shared handle to a watched source.
pub type SourceRef = Arc<dyn WatchedSource>;
