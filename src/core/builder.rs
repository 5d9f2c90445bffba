//! # Runtime: wires the bus, subscribers, hub and scheduler together.
//!
//! ```text
//! RuntimeBuilder::new(cfg)
//!     .with_subscribers(subs)      // optional observers
//!     .with_receiver(receiver)     // optional, defaults to HubReceiver(hub)
//!     .build()
//!        ├─► Bus::new(cfg.bus_capacity)
//!        ├─► SubscriberSet::new(subs, bus)  ◄── listener: Bus ──► set.emit()
//!        ├─► Hub::new(bus)
//!        └─► Scheduler::new(cfg, bus, receiver)
//! ```
//!
//! [`Runtime::shutdown`] stops the poll tasks first, then drains the subscriber
//! queues, so the final shutdown events still reach every subscriber.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::scheduler::Scheduler;
use crate::endpoint::{Endpoint, SourceFactory};
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::hub::Hub;
use crate::receivers::{HubReceiver, ReceiverRef};
use crate::sources::{FetchMedia, HashtagSource};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`Runtime`].
pub struct RuntimeBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    receiver: Option<ReceiverRef>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            receiver: None,
        }
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the default hub fan-out with a custom receiver.
    ///
    /// The hub is still built (and reachable through [`Runtime::hub`]) but poll
    /// tasks no longer deliver to it.
    pub fn with_receiver(mut self, receiver: ReceiverRef) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Builds the runtime and starts the subscriber listener.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Runtime {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let hub = Arc::new(Hub::new(bus.clone()));
        let receiver = self
            .receiver
            .unwrap_or_else(|| Arc::new(HubReceiver::new(hub.clone(), bus.clone())));
        let scheduler = Scheduler::new(&self.cfg, bus.clone(), receiver);

        let token = CancellationToken::new();
        let listener = subscriber_listener(&bus, subs.clone(), token.clone());

        Runtime {
            cfg: self.cfg,
            bus,
            subs,
            hub,
            scheduler,
            token,
            listener,
        }
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled,
/// then flushes whatever is still buffered.
fn subscriber_listener(
    bus: &Bus,
    set: Arc<SubscriberSet>,
    token: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return,
                },
                _ = token.cancelled() => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    })
}

/// A running watch hub: scheduler, delivery hub and event plumbing.
pub struct Runtime {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    hub: Arc<Hub>,
    scheduler: Arc<Scheduler>,
    token: CancellationToken,
    listener: JoinHandle<()>,
}

impl Runtime {
    /// Starts building a runtime.
    pub fn builder(cfg: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    /// Configuration the runtime was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared by every component.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Delivery hub.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Poll scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Command endpoint building sources with `factory`.
    pub fn endpoint(&self, factory: SourceFactory) -> Endpoint {
        Endpoint::new(self.hub.clone(), self.scheduler.clone(), factory)
            .with_connection_capacity(self.cfg.connection_capacity_clamped())
    }

    /// Command endpoint that watches hashtags through `fetcher`,
    /// polling each one every [`Config::default_interval`].
    pub fn hashtag_endpoint(&self, fetcher: Arc<dyn FetchMedia>) -> Endpoint {
        let interval = self.cfg.default_interval;
        self.endpoint(Arc::new(move |slug: &str| {
            HashtagSource::arc(slug, interval, fetcher.clone())
        }))
    }

    /// Stops every poll task, then drains subscriber queues.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] when poll tasks outlive the grace period;
    /// subscribers are drained either way.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        let res = self.scheduler.shutdown().await;

        self.token.cancel();
        let _ = self.listener.await;
        if let Ok(set) = Arc::try_unwrap(self.subs) {
            set.shutdown().await;
        }
        res
    }
}
