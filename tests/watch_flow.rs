//! End-to-end flows through the public API: commands in, deliveries out.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time;

use watchhub::{
    Config, Connection, ConnectionId, Delivery, DeliveryError, Event, EventKind, FetchError,
    FetchMedia, Item, Runtime, Subscribe, Topic,
};

/// Media fixture: pops one scripted batch per fetch, then returns nothing.
struct Feed {
    batches: Mutex<VecDeque<Vec<Item>>>,
    fetched: Mutex<Vec<String>>,
}

impl Feed {
    fn new(batches: &[&[&str]]) -> Arc<Self> {
        let batches: VecDeque<Vec<Item>> = batches
            .iter()
            .map(|keys| {
                keys.iter()
                    .map(|k| Item::new(*k, serde_json::json!({ "id": k })))
                    .collect::<Vec<_>>()
            })
            .collect();
        Arc::new(Self {
            batches: Mutex::new(batches),
            fetched: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl FetchMedia for Feed {
    async fn fetch_media(&self, slug: &str) -> Result<Vec<Item>, FetchError> {
        self.fetched.lock().unwrap().push(slug.to_string());
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }
}

struct Broken(ConnectionId);

#[async_trait]
impl Connection for Broken {
    fn id(&self) -> ConnectionId {
        self.0
    }

    async fn send(&self, _delivery: &Delivery) -> Result<(), DeliveryError> {
        Err(DeliveryError::Closed)
    }
}

#[derive(Default)]
struct Recorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

const WATCH_BEER: &[u8] = br##"{"command":"watch","hashtag":"#Beer"}"##;

#[tokio::test(start_paused = true)]
async fn watchers_share_one_poll_task_and_get_new_items_only() {
    let runtime = Runtime::builder(Config::default()).build();
    let feed = Feed::new(&[&["3", "1", "5"], &["2", "5", "7"]]);
    let endpoint = runtime.hashtag_endpoint(feed.clone());

    let (a, mut rx_a) = endpoint.open_channel().await;
    let (b, mut rx_b) = endpoint.open_channel().await;
    // b listens before the first poll can run; its watch command then joins the task.
    runtime.hub().subscribe(b, Topic::new("beer")).await.unwrap();
    endpoint.handle(a, WATCH_BEER).await.unwrap();
    endpoint
        .handle(b, br#"{"command":"watch","hashtag":"beer"}"#)
        .await
        .unwrap();

    let mut keys_a = Vec::new();
    let mut keys_b = Vec::new();
    for _ in 0..4 {
        keys_a.push(rx_a.recv().await.unwrap().item.key);
        keys_b.push(rx_b.recv().await.unwrap().item.key);
    }

    assert_eq!(keys_a, ["1", "3", "5", "7"]);
    assert_eq!(keys_b, keys_a);
    assert_eq!(runtime.scheduler().list().await.len(), 1);
    assert!(feed.fetched.lock().unwrap().iter().all(|slug| slug == "beer"));

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_subscriber_is_dropped_and_others_keep_receiving() {
    let runtime = Runtime::builder(Config::default()).build();
    let endpoint = runtime.hashtag_endpoint(Feed::new(&[&["1"], &["2"]]));

    let broken = Arc::new(Broken(ConnectionId::next()));
    endpoint.connect(broken.clone()).await;
    let (good, mut rx) = endpoint.open_channel().await;
    runtime.hub().subscribe(good, Topic::new("beer")).await.unwrap();

    endpoint.handle(broken.id(), WATCH_BEER).await.unwrap();
    endpoint.handle(good, WATCH_BEER).await.unwrap();

    assert_eq!(rx.recv().await.unwrap().item.key, "1");
    assert!(!runtime.hub().contains(broken.id()).await);
    assert_eq!(rx.recv().await.unwrap().item.key, "2");

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unwatch_then_rewatch_resumes_after_last_delivered_key() {
    let runtime = Runtime::builder(Config::default()).build();
    let endpoint = runtime.hashtag_endpoint(Feed::new(&[&["1", "2"], &[], &["1", "2", "3"]]));
    let (id, mut rx) = endpoint.open_channel().await;

    endpoint.handle(id, WATCH_BEER).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().item.key, "1");
    assert_eq!(rx.recv().await.unwrap().item.key, "2");

    endpoint
        .handle(id, br#"{"command":"unwatch","hashtag":"beer"}"#)
        .await
        .unwrap();
    time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());

    endpoint.handle(id, WATCH_BEER).await.unwrap();
    let next = time::timeout(Duration::from_secs(30), rx.recv())
        .await
        .unwrap()
        .map(|d| d.item.key);
    assert_eq!(next.as_deref(), Some("3"));

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn bad_commands_are_rejected_without_dropping_the_connection() {
    let runtime = Runtime::builder(Config::default()).build();
    let endpoint = runtime.hashtag_endpoint(Feed::new(&[&["1"]]));
    let (id, mut rx) = endpoint.open_channel().await;

    assert!(endpoint.handle(id, b"{").await.is_err());
    assert!(endpoint
        .handle(id, br#"{"command":"mute","hashtag":"beer"}"#)
        .await
        .is_err());
    assert!(endpoint.handle(id, br#"{"command":"watch"}"#).await.is_err());
    assert!(runtime.hub().contains(id).await);

    endpoint.handle(id, WATCH_BEER).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().item.key, "1");

    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_reaches_subscribers_and_stops_polling() {
    let recorder = Arc::new(Recorder::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    let runtime = Runtime::builder(Config::default())
        .with_subscribers(subs)
        .build();
    let endpoint = runtime.hashtag_endpoint(Feed::new(&[&["1"]]));
    let (id, mut rx) = endpoint.open_channel().await;
    endpoint.handle(id, WATCH_BEER).await.unwrap();
    rx.recv().await.unwrap();

    let scheduler = runtime.scheduler().clone();
    runtime.shutdown().await.unwrap();

    assert!(scheduler.list().await.is_empty());
    let kinds = recorder.0.lock().unwrap().clone();
    assert!(kinds.contains(&EventKind::SourceWatched));
    assert!(kinds.contains(&EventKind::ItemEmitted));
    assert!(kinds.contains(&EventKind::PollStopped));
    assert_eq!(kinds.last(), Some(&EventKind::AllStoppedWithin));
}
