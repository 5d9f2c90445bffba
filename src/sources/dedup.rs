//! # Per-source high-water-mark tracker.
//!
//! [`DedupTracker`] remembers, for every source identifier, the largest item key
//! already delivered. The poll task of a source calls [`DedupTracker::admit`] for
//! each fetched item (in ascending key order); only keys strictly above the mark
//! pass and advance it.
//!
//! ## Rules
//! - Keys are compared **lexically** (`str` ordering), never numerically.
//! - A mark is created lazily on the first admitted key.
//! - Marks are never removed: re-watching a source resumes from its old mark.
//! - Single writer per identifier (one poll task per id); the lock only guards
//!   the map shape against concurrent tasks of different sources.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::RwLock;

use crate::sources::source::SourceId;

/// Thread-safe map of `source id → highest delivered key`.
#[derive(Debug, Default)]
pub struct DedupTracker {
    marks: RwLock<HashMap<SourceId, String>>,
}

impl DedupTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and advances the mark if `key` is above the current mark
    /// for `id` (or no mark exists yet); returns `false` for already-seen keys.
    pub async fn admit(&self, id: &SourceId, key: &str) -> bool {
        let mut marks = self.marks.write().await;
        match marks.entry(id.clone()) {
            Entry::Occupied(mut mark) => {
                if key > mark.get().as_str() {
                    key.clone_into(mark.get_mut());
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(key.to_owned());
                true
            }
        }
    }

    /// Returns the current high-water-mark for `id`, if any.
    pub async fn high_water_mark(&self, id: &str) -> Option<String> {
        self.marks.read().await.get(id).cloned()
    }

    /// Number of sources with a mark.
    pub async fn len(&self) -> usize {
        self.marks.read().await.len()
    }

    /// True if no source has a mark yet.
    pub async fn is_empty(&self) -> bool {
        self.marks.read().await.is_empty()
    }
}
