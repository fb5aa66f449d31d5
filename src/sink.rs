use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::meta::PageMeta;

/// The external consumer of crawl results.
///
/// The engine only ever appends: it never reads results back. For any URL,
/// `on_new_url` is called before the first `on_metadata` or `on_note` for
/// that URL; beyond that no cross-call ordering is guaranteed.
#[async_trait]
pub trait Sink: Send + Sync {
    /// A URL was admitted to the frontier and will be fetched.
    async fn on_new_url(&self, url: &str);
    /// Metadata fields were extracted for a URL. May be called more than
    /// once per URL with different fields filled in.
    async fn on_metadata(&self, url: &str, meta: &PageMeta);
    /// A human-readable annotation was recorded for a URL.
    async fn on_note(&self, url: &str, note: &str);
}

/// Everything the crawl learned about one URL.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct UrlRecord {
    pub first_seen: DateTime<Utc>,
    pub meta: PageMeta,
    pub notes: Vec<String>,
}

impl UrlRecord {
    fn new() -> Self {
        Self {
            first_seen: Utc::now(),
            meta: PageMeta::default(),
            notes: Vec::new(),
        }
    }
}

/// A bundled sink that accumulates per-URL records in memory.
///
/// Handy for tests and for callers that want to export results after the
/// crawl rather than stream them.
#[derive(Debug, Default)]
pub struct Collector {
    records: RwLock<HashMap<String, UrlRecord>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, url: &str) -> Option<UrlRecord> {
        self.records.read().await.get(url).cloned()
    }

    pub async fn records(&self) -> HashMap<String, UrlRecord> {
        self.records.read().await.clone()
    }

    pub async fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&*self.records.read().await)
    }
}

#[async_trait]
impl Sink for Collector {
    async fn on_new_url(&self, url: &str) {
        self.records
            .write()
            .await
            .entry(url.to_string())
            .or_insert_with(UrlRecord::new);
    }

    async fn on_metadata(&self, url: &str, meta: &PageMeta) {
        self.records
            .write()
            .await
            .entry(url.to_string())
            .or_insert_with(UrlRecord::new)
            .meta
            .merge(meta);
    }

    async fn on_note(&self, url: &str, note: &str) {
        self.records
            .write()
            .await
            .entry(url.to_string())
            .or_insert_with(UrlRecord::new)
            .notes
            .push(note.to_string());
    }
}
