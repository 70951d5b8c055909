// tests/common/mod.rs
//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crypto_news_relay::enrich::{EnrichedItem, MetadataEnricher};
use crypto_news_relay::error::{RelayError, RelayResult};
use crypto_news_relay::ledger::{LedgerStore, LinkLedger};
use crypto_news_relay::news::{NewsItem, NewsSource};
use crypto_news_relay::notify::{DeliverySink, DeliveryTarget};
use crypto_news_relay::scheduler::{Collaborators, DedupScheduler, SchedulerCfg};

pub const CHANNEL: &str = "@relay_test";

pub fn item(n: usize) -> NewsItem {
    NewsItem {
        link: format!("https://news.example/{n}"),
        title: format!("Headline {n}"),
        summary: format!("Summary {n}"),
        image_hint: None,
    }
}

pub fn items(range: std::ops::RangeInclusive<usize>) -> Vec<NewsItem> {
    range.map(item).collect()
}

pub fn link(n: usize) -> String {
    format!("https://news.example/{n}")
}

// ---------------- source ----------------

pub struct FixedSource {
    pub items: Mutex<Vec<NewsItem>>,
    pub fail: AtomicBool,
}

impl FixedSource {
    pub fn new(items: Vec<NewsItem>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait::async_trait]
impl NewsSource for FixedSource {
    async fn fetch_latest(&self, limit: usize) -> RelayResult<Vec<NewsItem>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::Fetch("source down".into()));
        }
        Ok(self.items.lock().iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

// ---------------- enricher ----------------

/// Uses the item's own title/summary; links in `with_image` get an image,
/// links in `unreachable` fail. `delay` forces a suspension point.
pub struct StaticEnricher {
    pub with_image: HashSet<String>,
    pub unreachable: Mutex<HashSet<String>>,
    pub delay: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl StaticEnricher {
    pub fn plain() -> Arc<Self> {
        Arc::new(Self {
            with_image: HashSet::new(),
            unreachable: Mutex::new(HashSet::new()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_images(links: &[String]) -> Arc<Self> {
        Arc::new(Self {
            with_image: links.iter().cloned().collect(),
            unreachable: Mutex::new(HashSet::new()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            with_image: HashSet::new(),
            unreachable: Mutex::new(HashSet::new()),
            delay: Some(delay),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl MetadataEnricher for StaticEnricher {
    async fn resolve(&self, item: &NewsItem) -> RelayResult<EnrichedItem> {
        self.calls.lock().push(item.link.clone());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.unreachable.lock().contains(&item.link) {
            return Err(RelayError::Enrichment {
                link: item.link.clone(),
                reason: "connection refused".into(),
            });
        }
        let image = self
            .with_image
            .contains(&item.link)
            .then(|| format!("{}/cover.png", item.link));
        Ok(EnrichedItem::from_metadata(
            item.clone(),
            Some(item.title.clone()),
            Some(item.summary.clone()),
            image,
        ))
    }
}

// ---------------- sink ----------------

/// Records successful sends; rejects any send to a destination in
/// `reject_destinations` or of a link in `reject_links`.
pub struct RecordingSink {
    pub sent: Mutex<Vec<(DeliveryTarget, EnrichedItem)>>,
    pub attempts: Mutex<Vec<(String, String)>>,
    pub reject_destinations: Mutex<HashSet<String>>,
    pub reject_links: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            attempts: Mutex::new(Vec::new()),
            reject_destinations: Mutex::new(HashSet::new()),
            reject_links: Mutex::new(HashSet::new()),
        })
    }

    pub fn sent_links(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|(_, e)| e.item.link.clone())
            .collect()
    }

    pub fn sent_to(&self, destination: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(t, _)| t.destination == destination)
            .map(|(_, e)| e.item.link.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, target: &DeliveryTarget, item: &EnrichedItem) -> RelayResult<()> {
        self.attempts
            .lock()
            .push((target.destination.clone(), item.item.link.clone()));
        let rejected = self.reject_destinations.lock().contains(&target.destination)
            || self.reject_links.lock().contains(&item.item.link);
        if rejected {
            return Err(RelayError::Delivery {
                destination: target.destination.clone(),
                reason: "Bad Request: wrong file identifier/HTTP URL specified".into(),
            });
        }
        self.sent.lock().push((target.clone(), item.clone()));
        Ok(())
    }
}

// ---------------- ledger store ----------------

/// Shared in-memory "disk" so a test can reload it as a fresh process would.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub disk: Arc<Mutex<Option<Vec<String>>>>,
    pub fail_saves: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn with(links: &[String]) -> Self {
        Self {
            disk: Arc::new(Mutex::new(Some(links.to_vec()))),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn on_disk(&self) -> Vec<String> {
        self.disk.lock().clone().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStore {
    fn load(&self) -> RelayResult<Option<Vec<String>>> {
        Ok(self.disk.lock().clone())
    }

    async fn save(&self, links: &[String]) -> RelayResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RelayError::Storage("disk full".into()));
        }
        *self.disk.lock() = Some(links.to_vec());
        Ok(())
    }
}

// ---------------- assembly ----------------

pub struct Harness {
    pub source: Arc<FixedSource>,
    pub enricher: Arc<StaticEnricher>,
    pub sink: Arc<RecordingSink>,
    pub store: MemoryStore,
    pub scheduler: Arc<DedupScheduler>,
}

pub fn harness(
    candidates: Vec<NewsItem>,
    already_sent: &[String],
    enricher: Arc<StaticEnricher>,
    cfg: SchedulerCfg,
) -> Harness {
    let source = FixedSource::new(candidates);
    let sink = RecordingSink::new();
    let store = MemoryStore::with(already_sent);
    let ledger = LinkLedger::load(Box::new(store.clone())).expect("memory ledger loads");
    let scheduler = Arc::new(DedupScheduler::new(
        Collaborators {
            source: source.clone(),
            enricher: enricher.clone(),
            sink: sink.clone(),
        },
        ledger,
        DeliveryTarget::channel(CHANNEL),
        cfg,
    ));
    Harness {
        source,
        enricher,
        sink,
        store,
        scheduler,
    }
}

pub fn default_harness(candidates: Vec<NewsItem>, already_sent: &[String]) -> Harness {
    harness(candidates, already_sent, StaticEnricher::plain(), SchedulerCfg::default())
}
