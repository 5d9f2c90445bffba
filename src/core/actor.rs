//! # PollActor: the long-running poll task of one source.
//!
//! ## Architecture
//! ```text
//! Registry::watch ──► tokio::spawn(PollActor::run(token, predecessor))
//!
//! await predecessor                      // previous task of the same id; awaited even if cancelled
//! loop {
//!   ├─► token cancelled? → break          (non-blocking check)
//!   ├─► cycle += 1, publish PollStarting
//!   ├─► run_cycle() ──► fetch → sort → dedup → receive
//!   ├─► token cancelled? → break          (no sleep after cancellation)
//!   ├─► publish PollIdle{ delay }
//!   └─► sleep(jitter(interval)) ◄── cancellable
//! }
//! publish PollStopped
//! ```
//!
//! ## Rules
//! - Cycles run **sequentially** within one actor (never parallel)
//! - Cancellation is observed at the top of each cycle, during fetch and during the sleep
//! - A failed fetch never ends the loop

use std::{sync::Arc, time::Duration};

use tokio::{select, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::runner::{Cycle, run_cycle},
    events::{Bus, Event, EventKind},
    policies::JitterPolicy,
    receivers::ReceiverRef,
    sources::{DedupTracker, SourceRef},
};

/// Polls one [`WatchedSource`](crate::WatchedSource) until cancelled.
pub struct PollActor {
    /// Source to poll.
    pub source: SourceRef,
    /// Shared high-water-marks.
    pub dedup: Arc<DedupTracker>,
    /// Consumer of admitted items.
    pub receiver: ReceiverRef,
    /// Internal event bus (used to publish poll events).
    pub bus: Bus,
    /// Randomization of the interval sleep.
    pub jitter: JitterPolicy,
}

impl PollActor {
    /// Creates a new poll actor.
    pub fn new(
        source: SourceRef,
        dedup: Arc<DedupTracker>,
        receiver: ReceiverRef,
        bus: Bus,
        jitter: JitterPolicy,
    ) -> Self {
        Self {
            source,
            dedup,
            receiver,
            bus,
            jitter,
        }
    }

    /// Runs the poll loop until `token` is cancelled.
    ///
    /// `predecessor` is the join handle of a previous, already cancelled task
    /// for the same identifier. This task exits only after the predecessor has,
    /// even when cancelled first, so a source never has two tasks writing its
    /// high-water-mark.
    pub async fn run(self, token: CancellationToken, predecessor: Option<JoinHandle<()>>) {
        if let Some(mut prev) = predecessor {
            select! {
                _ = &mut prev => {}
                _ = token.cancelled() => {
                    // Exit only after the predecessor; it is already cancelled.
                    let _ = prev.await;
                    self.publish_stopped(0);
                    return;
                }
            }
        }

        let mut cycle: u64 = 0;
        loop {
            if token.is_cancelled() {
                break;
            }

            cycle += 1;
            self.bus.publish(
                Event::new(EventKind::PollStarting)
                    .with_source(self.source.id())
                    .with_cycle(cycle),
            );

            let res = run_cycle(
                self.source.as_ref(),
                &self.dedup,
                self.receiver.as_ref(),
                &self.bus,
                &token,
                cycle,
            )
            .await;

            if token.is_cancelled() || res == Cycle::Cancelled {
                break;
            }

            let delay = self.next_delay();
            let emitted = match res {
                Cycle::Completed { emitted, .. } => emitted as u64,
                _ => 0,
            };
            self.bus.publish(
                Event::new(EventKind::PollIdle)
                    .with_source(self.source.id())
                    .with_cycle(cycle)
                    .with_count(emitted)
                    .with_delay(delay),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => { break; }
            }
        }

        self.publish_stopped(cycle);
    }

    fn next_delay(&self) -> Duration {
        self.jitter.apply(self.source.interval())
    }

    fn publish_stopped(&self, cycle: u64) {
        self.bus.publish(
            Event::new(EventKind::PollStopped)
                .with_source(self.source.id())
                .with_cycle(cycle),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::error::FetchError;
    use crate::receivers::Receive;
    use crate::sources::{Item, SourceFn, WatchedSource};

    struct Forward(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl Receive for Forward {
        async fn receive(&self, item: &Item, _source: &dyn WatchedSource) {
            let _ = self.0.send(item.key.clone());
        }
    }

    fn actor(source: SourceRef, tx: mpsc::UnboundedSender<String>, bus: Bus) -> PollActor {
        PollActor::new(
            source,
            Arc::new(DedupTracker::new()),
            Arc::new(Forward(tx)),
            bus,
            JitterPolicy::None,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_do_not_stop_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source: SourceRef = SourceFn::arc("beer", Duration::from_secs(2), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FetchError::unavailable("down"))
                } else {
                    Ok(vec![Item::new(n.to_string(), serde_json::Value::Null)])
                }
            }
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let handle = tokio::spawn(actor(source, tx, Bus::new(64)).run(token.clone(), None));

        // Two failed cycles, then the third delivers.
        assert_eq!(rx.recv().await.as_deref(), Some("2"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_preempts_interval_sleep() {
        let source: SourceRef = SourceFn::arc("beer", Duration::from_secs(3600), || async {
            Ok::<_, FetchError>(vec![Item::new("1", serde_json::Value::Null)])
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bus = Bus::new(64);
        let mut events = bus.subscribe();
        let token = CancellationToken::new();
        let handle = tokio::spawn(actor(source, tx, bus).run(token.clone(), None));

        assert_eq!(rx.recv().await.as_deref(), Some("1"));
        token.cancel();

        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("actor should stop without waiting for the interval")
            .unwrap();

        let mut last = None;
        while let Ok(ev) = events.try_recv() {
            last = Some(ev);
        }
        let last = last.unwrap();
        assert_eq!(last.kind, EventKind::PollStopped);
        assert_eq!(last.cycle, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_predecessor_before_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source: SourceRef = SourceFn::arc("beer", Duration::from_secs(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FetchError>(Vec::new()) }
        });
        let predecessor = tokio::spawn(time::sleep(Duration::from_secs(10)));
        let (tx, _rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let handle =
            tokio::spawn(actor(source, tx, Bus::new(64)).run(token.clone(), Some(predecessor)));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(6)).await;
        assert!(calls.load(Ordering::SeqCst) >= 1);

        token.cancel();
        handle.await.unwrap();
    }
}
