//! # Watched sources and deduplication.
//!
//! This module provides the source-related types:
//! - [`WatchedSource`] - trait for pollable external data sources
//! - [`SourceRef`] - shared reference to a source (`Arc<dyn WatchedSource>`)
//! - [`SourceFn`] - closure-backed source
//! - [`HashtagSource`] / [`FetchMedia`] - hashtag feed source and its fetch collaborator
//! - [`DedupTracker`] - per-source high-water-mark filter
//! - [`SourceId`], [`Item`] - identity and payload types

mod dedup;
mod hashtag;
mod source;
mod source_fn;

pub use dedup::DedupTracker;
pub use hashtag::{FetchMedia, HashtagSource};
pub use source::{Item, SourceId, SourceRef, WatchedSource};
pub use source_fn::SourceFn;
