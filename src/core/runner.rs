//! # Run a single poll cycle of a watched source.
//!
//! - **Fetch once**, raced against cancellation
//! - **Sort** the batch ascending by key (stable), whatever the source promised
//! - **Deduplicate** each item against the source's high-water-mark
//! - **Emit** admitted items to the receiver, in order
//!
//! ## Event flow
//! ```text
//! Success:
//!   fetch() → Ok(items) → sort → for item: admit? → receive + ItemEmitted
//!                                               └─ ItemSkipped
//! Failure:
//!   fetch() → Err(e) → FetchFailed (cycle counts as empty)
//!
//! Cancellation:
//!   token cancelled while fetch is pending → fetch dropped, nothing published
//! ```
//!
//! ## Rules
//! - A fetch error never escapes the cycle.
//! - Once a batch is fetched it is processed to the end; cancellation is
//!   observed by the caller before the next cycle.

use tokio_util::sync::CancellationToken;

use crate::{
    events::{Bus, Event, EventKind},
    receivers::Receive,
    sources::{DedupTracker, WatchedSource},
};

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// Batch processed.
    Completed {
        /// Items handed to the receiver.
        emitted: usize,
        /// Items at or below the high-water-mark.
        skipped: usize,
    },
    /// Fetch failed; treated as an empty batch.
    FetchFailed,
    /// Cancelled while fetching.
    Cancelled,
}

/// Executes one poll cycle of `source`, publishing per-item events to `bus`.
pub async fn run_cycle(
    source: &dyn WatchedSource,
    dedup: &DedupTracker,
    receiver: &dyn Receive,
    bus: &Bus,
    token: &CancellationToken,
    cycle: u64,
) -> Cycle {
    let fetched = tokio::select! {
        res = source.fetch() => res,
        _ = token.cancelled() => return Cycle::Cancelled,
    };

    let mut items = match fetched {
        Ok(items) => items,
        Err(e) => {
            bus.publish(
                Event::new(EventKind::FetchFailed)
                    .with_source(source.id())
                    .with_cycle(cycle)
                    .with_reason(e.to_string()),
            );
            return Cycle::FetchFailed;
        }
    };

    items.sort_by(|a, b| a.key.cmp(&b.key));

    let (mut emitted, mut skipped) = (0, 0);
    for item in &items {
        if dedup.admit(source.id(), &item.key).await {
            receiver.receive(item, source).await;
            emitted += 1;
            bus.publish(
                Event::new(EventKind::ItemEmitted)
                    .with_source(source.id())
                    .with_cycle(cycle)
                    .with_item_key(&item.key),
            );
        } else {
            skipped += 1;
            bus.publish(
                Event::new(EventKind::ItemSkipped)
                    .with_source(source.id())
                    .with_cycle(cycle)
                    .with_item_key(&item.key),
            );
        }
    }

    Cycle::Completed { emitted, skipped }
}
