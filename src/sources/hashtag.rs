//! # Hashtag source.
//!
//! [`HashtagSource`] watches the public media feed of one hashtag. Retrieval is
//! delegated to a [`FetchMedia`] collaborator (an HTTP scraper, an API client, a
//! fixture in tests); the source only owns the identity and the poll interval.
//!
//! The identifier is the normalized slug, so `"#Beer"`, `"beer"` and `" beer "`
//! are the same source (and the same hub topic).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::sources::source::{Item, SourceId, SourceRef, WatchedSource};

/// External collaborator that retrieves the media of a hashtag.
#[async_trait]
pub trait FetchMedia: Send + Sync + 'static {
    /// Returns the media currently listed under `slug`.
    async fn fetch_media(&self, slug: &str) -> Result<Vec<Item>, FetchError>;
}

/// Watched source for one hashtag.
#[derive(Clone)]
pub struct HashtagSource {
    id: SourceId,
    interval: Duration,
    fetcher: Arc<dyn FetchMedia>,
}

impl HashtagSource {
    /// Creates a hashtag source; `slug` is normalized with [`HashtagSource::normalize`].
    pub fn new(slug: &str, interval: Duration, fetcher: Arc<dyn FetchMedia>) -> Self {
        Self {
            id: SourceId::from(Self::normalize(slug)),
            interval,
            fetcher,
        }
    }

    /// Creates the source and returns it as a shared handle.
    pub fn arc(slug: &str, interval: Duration, fetcher: Arc<dyn FetchMedia>) -> SourceRef {
        Arc::new(Self::new(slug, interval, fetcher))
    }

    /// Canonical form of a slug: trimmed, one leading `#` removed, lowercased.
    ///
    /// ```
    /// use watchhub::HashtagSource;
    ///
    /// assert_eq!(HashtagSource::normalize(" #Beer "), "beer");
    /// ```
    pub fn normalize(slug: &str) -> String {
        let slug = slug.trim();
        slug.strip_prefix('#').unwrap_or(slug).to_lowercase()
    }

    /// Normalized slug (same as the identifier).
    pub fn slug(&self) -> &str {
        self.id.as_str()
    }
}

#[async_trait]
impl WatchedSource for HashtagSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        self.fetcher.fetch_media(self.slug()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FetchMedia for Recording {
        async fn fetch_media(&self, slug: &str) -> Result<Vec<Item>, FetchError> {
            self.seen.lock().unwrap().push(slug.to_string());
            Ok(vec![Item::new("1", serde_json::json!({ "tag": slug }))])
        }
    }

    #[test]
    fn test_identical_configuration_yields_same_id() {
        let fetcher: Arc<dyn FetchMedia> = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let a = HashtagSource::new("#Beer", Duration::from_secs(2), fetcher.clone());
        let b = HashtagSource::new(" beer", Duration::from_secs(5), fetcher);

        assert_eq!(a.id(), b.id());
        assert_eq!(a.slug(), "beer");
    }

    #[test]
    fn test_only_one_hash_is_stripped() {
        assert_eq!(HashtagSource::normalize("##beer"), "#beer");
    }

    #[tokio::test]
    async fn test_fetch_uses_normalized_slug() {
        let fetcher = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let source = HashtagSource::new("#IPA", Duration::from_secs(2), fetcher.clone());

        let items = source.fetch().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(*fetcher.seen.lock().unwrap(), ["ipa"]);
    }
}
