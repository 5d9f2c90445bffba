//! # Poll registry: one task per watched source.
//!
//! The registry owns the poll task handles and the informational interest counters.
//!
//! ## Architecture
//! ```text
//! watch(source)
//!   ├─► runtime cancelled?            → Err(ShuttingDown)
//!   ├─► interest[id] += 1
//!   ├─► live task for id?             → WatchJoined, AlreadyRunning{ interest }
//!   └─► predecessor = retiring[id] | finished handle
//!       spawn PollActor::run(child_token, predecessor) → SourceWatched, Started
//!
//! unwatch(id)
//!   ├─► tasks.remove(id)  → cancel, join handle moves to `retiring` → SourceUnwatched
//!   └─► nothing registered                                           → UnwatchIgnored
//!
//! drain(deadline)
//!   └─► cancel runtime token, await every task and retiring handle until deadline
//! ```
//!
//! ## Rules
//! - At most one live handle per identifier
//! - A re-watched identifier never runs concurrently with its cancelled predecessor
//! - One `unwatch` stops the task, whatever the interest count says

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::core::actor::PollActor;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::JitterPolicy;
use crate::receivers::ReceiverRef;
use crate::sources::{DedupTracker, SourceId, SourceRef};

/// Result of [`Scheduler::watch`](crate::Scheduler::watch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A new poll task was spawned.
    Started,
    /// A poll task was already running; only the interest count moved.
    AlreadyRunning {
        /// Number of `watch` calls since the task started.
        interest: u64,
    },
}

/// Result of [`Scheduler::unwatch`](crate::Scheduler::unwatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnwatchOutcome {
    /// The poll task was cancelled and released.
    Stopped,
    /// Nothing was registered under the identifier.
    NotWatched,
}

/// Handle to a running poll task.
struct Handle {
    source: SourceRef,
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct State {
    tasks: HashMap<SourceId, Handle>,
    interest: HashMap<SourceId, u64>,
    /// Cancelled tasks that may still be finishing a fetch.
    retiring: HashMap<SourceId, JoinHandle<()>>,
}

/// Registry of active poll tasks.
pub struct Registry {
    state: RwLock<State>,
    bus: Bus,
    runtime_token: CancellationToken,
    dedup: Arc<DedupTracker>,
    receiver: ReceiverRef,
    jitter: JitterPolicy,
}

impl Registry {
    /// Creates a new registry.
    pub fn new(
        bus: Bus,
        runtime_token: CancellationToken,
        dedup: Arc<DedupTracker>,
        receiver: ReceiverRef,
        jitter: JitterPolicy,
    ) -> Self {
        Self {
            state: RwLock::new(State::default()),
            bus,
            runtime_token,
            dedup,
            receiver,
            jitter,
        }
    }

    /// Ensures a poll task for `source.id()` is running.
    pub async fn watch(&self, source: SourceRef) -> Result<WatchOutcome, RuntimeError> {
        let id = source.id().clone();
        let mut state = self.state.write().await;
        if self.runtime_token.is_cancelled() {
            return Err(RuntimeError::ShuttingDown);
        }

        let interest = {
            let n = state.interest.entry(id.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let predecessor = match state.tasks.remove(&id) {
            Some(h) if !h.join.is_finished() => {
                state.tasks.insert(id.clone(), h);
                drop(state);
                self.bus.publish(
                    Event::new(EventKind::WatchJoined)
                        .with_source(&id)
                        .with_count(interest),
                );
                return Ok(WatchOutcome::AlreadyRunning { interest });
            }
            Some(stale) => Some(stale.join),
            None => state.retiring.remove(&id),
        };

        let cancel = self.runtime_token.child_token();
        let actor = PollActor::new(
            source.clone(),
            self.dedup.clone(),
            self.receiver.clone(),
            self.bus.clone(),
            self.jitter,
        );
        let join = tokio::spawn(actor.run(cancel.clone(), predecessor));
        state.tasks.insert(
            id.clone(),
            Handle {
                source,
                join,
                cancel,
            },
        );
        drop(state);

        self.bus.publish(
            Event::new(EventKind::SourceWatched)
                .with_source(&id)
                .with_count(interest),
        );
        Ok(WatchOutcome::Started)
    }

    /// Cancels and releases the task registered under `id`.
    pub async fn unwatch(&self, id: &str) -> UnwatchOutcome {
        let mut state = self.state.write().await;
        state.retiring.retain(|_, join| !join.is_finished());
        let interest = state.interest.remove(id).unwrap_or(0);

        match state.tasks.remove(id) {
            Some(handle) => {
                handle.cancel.cancel();
                state
                    .retiring
                    .insert(handle.source.id().clone(), handle.join);
                drop(state);
                self.bus.publish(
                    Event::new(EventKind::SourceUnwatched)
                        .with_source(id)
                        .with_count(interest),
                );
                UnwatchOutcome::Stopped
            }
            None => {
                drop(state);
                self.bus
                    .publish(Event::new(EventKind::UnwatchIgnored).with_source(id));
                UnwatchOutcome::NotWatched
            }
        }
    }

    /// Returns sorted list of watched identifiers.
    pub async fn list(&self) -> Vec<SourceId> {
        let state = self.state.read().await;
        let mut ids: Vec<SourceId> = state.tasks.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if a poll task is registered under `id`.
    pub async fn is_watched(&self, id: &str) -> bool {
        self.state.read().await.tasks.contains_key(id)
    }

    /// Returns the number of `watch` calls recorded for `id` (0 when not watched).
    pub async fn interest(&self, id: &str) -> u64 {
        self.state
            .read()
            .await
            .interest
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Cancels every task and waits for them until `deadline`.
    ///
    /// Returns the sorted identifiers of tasks still running at the deadline.
    /// With no deadline the tasks are cancelled and left to exit on their own.
    /// After this call every `watch` fails with [`RuntimeError::ShuttingDown`].
    pub async fn drain(&self, deadline: Option<Instant>) -> Vec<String> {
        let joins: Vec<(SourceId, JoinHandle<()>)> = {
            let mut state = self.state.write().await;
            self.runtime_token.cancel();
            state.interest.clear();
            let running = state.tasks.drain().map(|(id, h)| (id, h.join));
            let mut joins: Vec<_> = running.collect();
            joins.extend(state.retiring.drain());
            joins
        };
        let Some(deadline) = deadline else {
            return Vec::new();
        };

        let mut stuck = Vec::new();
        for (id, join) in joins {
            match time::timeout_at(deadline, join).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.bus.publish(
                        Event::new(EventKind::PollDead)
                            .with_source(&id)
                            .with_reason(e.to_string()),
                    );
                }
                Err(_elapsed) => stuck.push(id.as_str().to_string()),
            }
        }
        stuck.sort_unstable();
        stuck.dedup();
        stuck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::error::FetchError;
    use crate::receivers::Receive;
    use crate::sources::{Item, SourceFn, WatchedSource};

    struct Discard;

    #[async_trait]
    impl Receive for Discard {
        async fn receive(&self, _item: &Item, _source: &dyn WatchedSource) {}
    }

    fn registry(bus: Bus) -> Registry {
        Registry::new(
            bus,
            CancellationToken::new(),
            Arc::new(DedupTracker::new()),
            Arc::new(Discard),
            JitterPolicy::None,
        )
    }

    fn counting(id: &str, calls: Arc<AtomicUsize>) -> SourceRef {
        SourceFn::arc(id, Duration::from_secs(60), move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, FetchError>(Vec::new()) }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_watch_keeps_one_task() {
        let reg = registry(Bus::new(64));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = reg.watch(counting("beer", calls.clone())).await.unwrap();
        let second = reg.watch(counting("beer", calls.clone())).await.unwrap();

        assert_eq!(first, WatchOutcome::Started);
        assert_eq!(second, WatchOutcome::AlreadyRunning { interest: 2 });
        assert_eq!(reg.list().await, [SourceId::new("beer")]);
        assert_eq!(reg.interest("beer").await, 2);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unwatch_unknown_is_not_an_error() {
        let bus = Bus::new(8);
        let mut events = bus.subscribe();
        let reg = registry(bus);

        assert_eq!(reg.unwatch("nope").await, UnwatchOutcome::NotWatched);
        assert_eq!(events.recv().await.unwrap().kind, EventKind::UnwatchIgnored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_unwatch_stops_regardless_of_interest() {
        let reg = registry(Bus::new(64));
        let calls = Arc::new(AtomicUsize::new(0));
        reg.watch(counting("beer", calls.clone())).await.unwrap();
        reg.watch(counting("beer", calls.clone())).await.unwrap();

        assert_eq!(reg.unwatch("beer").await, UnwatchOutcome::Stopped);
        assert!(!reg.is_watched("beer").await);
        assert_eq!(reg.interest("beer").await, 0);
        assert_eq!(reg.unwatch("beer").await, UnwatchOutcome::NotWatched);
    }

    /// Counts concurrent `receive` calls; the first call parks until released.
    #[derive(Default)]
    struct Gate {
        active: AtomicUsize,
        max: AtomicUsize,
        total: AtomicUsize,
        parked: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Receive for Gate {
        async fn receive(&self, _item: &Item, _source: &dyn WatchedSource) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            if !self.parked.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewatch_chain_never_overlaps_tasks() {
        let gate = Arc::new(Gate::default());
        let receiver: ReceiverRef = gate.clone();
        let reg = Registry::new(
            Bus::new(256),
            CancellationToken::new(),
            Arc::new(DedupTracker::new()),
            receiver,
            JitterPolicy::None,
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let source = || -> SourceRef {
            let calls = calls.clone();
            SourceFn::arc("beer", Duration::from_secs(2), move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let key = format!("{n:04}");
                    Ok::<_, FetchError>(vec![Item::new(key, serde_json::Value::Null)])
                }
            })
        };

        reg.watch(source()).await.unwrap();
        gate.entered.notified().await;

        // First task is parked inside `receive`.
        reg.unwatch("beer").await;
        reg.watch(source()).await.unwrap();
        reg.unwatch("beer").await;
        reg.watch(source()).await.unwrap();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(gate.total.load(Ordering::SeqCst), 1);

        gate.release.notify_one();
        time::sleep(Duration::from_secs(5)).await;

        assert!(gate.total.load(Ordering::SeqCst) >= 2);
        assert_eq!(gate.max.load(Ordering::SeqCst), 1);
        assert!(reg.drain(Some(Instant::now() + Duration::from_secs(1))).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_rejects_later_watches() {
        let reg = registry(Bus::new(64));
        let calls = Arc::new(AtomicUsize::new(0));
        reg.watch(counting("beer", calls.clone())).await.unwrap();

        let stuck = reg.drain(Some(Instant::now() + Duration::from_secs(1))).await;
        assert!(stuck.is_empty());
        assert!(reg.list().await.is_empty());
        assert_eq!(
            reg.watch(counting("beer", calls)).await,
            Err(RuntimeError::ShuttingDown)
        );
    }
}
