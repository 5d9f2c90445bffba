//! # Scheduler: public face of the polling side.
//!
//! [`Scheduler`] keeps one poll task running per watched source, owns the
//! shared [`DedupTracker`], and drives graceful shutdown of the poll tasks.
//!
//! ## Shutdown path
//! ```text
//! shutdown()
//!   └─► Bus.publish(ShutdownRequested)
//!   └─► registry.drain(now + cfg.grace)   → cancels runtime token (all child tokens)
//!          ├─ grace = 0       → no wait, Bus.publish(AllStoppedWithin)
//!          ├─ all joined      → Bus.publish(AllStoppedWithin)
//!          └─ deadline passed → Bus.publish(GraceExceeded), Err(GraceExceeded{ stuck })
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::registry::{Registry, UnwatchOutcome, WatchOutcome};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::receivers::ReceiverRef;
use crate::sources::{DedupTracker, SourceId, SourceRef};

/// Runs one poll task per watched source.
pub struct Scheduler {
    registry: Registry,
    dedup: Arc<DedupTracker>,
    bus: Bus,
    grace: Option<Duration>,
}

impl Scheduler {
    /// Creates a scheduler delivering admitted items to `receiver`.
    pub fn new(cfg: &Config, bus: Bus, receiver: ReceiverRef) -> Arc<Self> {
        let dedup = Arc::new(DedupTracker::new());
        let registry = Registry::new(
            bus.clone(),
            CancellationToken::new(),
            dedup.clone(),
            receiver,
            cfg.jitter,
        );
        Arc::new(Self {
            registry,
            dedup,
            bus,
            grace: cfg.grace_period(),
        })
    }

    /// Ensures a poll task for `source` is running.
    ///
    /// Watching an identifier that is already running only bumps its interest
    /// count and returns [`WatchOutcome::AlreadyRunning`].
    ///
    /// # Errors
    /// [`RuntimeError::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun.
    pub async fn watch(&self, source: SourceRef) -> Result<WatchOutcome, RuntimeError> {
        self.registry.watch(source).await
    }

    /// Stops the poll task of `id`.
    ///
    /// The dedup high-water-mark survives, so a later `watch` resumes after the
    /// last delivered key.
    pub async fn unwatch(&self, id: &str) -> UnwatchOutcome {
        self.registry.unwatch(id).await
    }

    /// Sorted identifiers of the running poll tasks.
    pub async fn list(&self) -> Vec<SourceId> {
        self.registry.list().await
    }

    /// Returns true if `id` has a running poll task.
    pub async fn is_watched(&self, id: &str) -> bool {
        self.registry.is_watched(id).await
    }

    /// Number of `watch` calls recorded for `id` since its task started.
    pub async fn interest(&self, id: &str) -> u64 {
        self.registry.interest(id).await
    }

    /// Shared high-water-marks of every source ever polled.
    pub fn dedup(&self) -> &DedupTracker {
        &self.dedup
    }

    /// Event bus the poll tasks publish to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Cancels every poll task and waits up to the configured grace period.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing the sources still running at the deadline.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        let deadline = self.grace.map(|grace| Instant::now() + grace);
        let stuck = self.registry.drain(deadline).await;
        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            self.bus.publish(
                Event::new(EventKind::GraceExceeded)
                    .with_count(stuck.len() as u64)
                    .with_reason(stuck.join(",")),
            );
            Err(RuntimeError::GraceExceeded {
                grace: self.grace.unwrap_or_default(),
                stuck,
            })
        }
    }
}
