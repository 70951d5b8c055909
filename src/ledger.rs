// src/ledger.rs
//! Persistent link ledger: the set of links already delivered.
//!
//! The ledger only grows. Every commit rewrites the whole JSON array on disk,
//! so a crash loses at most the send that was in flight.
//! Loading happens once at startup; saving runs inside a cycle and goes
//! through `tokio::fs`.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use metrics::{counter, gauge};

use crate::error::{RelayError, RelayResult};

pub const DEFAULT_LEDGER_PATH: &str = "sent_news_links.json";

/// Durable backing store for the ledger.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// `Ok(None)` when no prior state exists.
    fn load(&self) -> RelayResult<Option<Vec<String>>>;
    /// Replace the stored state with `links`.
    async fn save(&self, links: &[String]) -> RelayResult<()>;
}

/// JSON array of link strings in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl LedgerStore for JsonFileStore {
    fn load(&self) -> RelayResult<Option<Vec<String>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            RelayError::Storage(format!("reading {}: {e}", self.path.display()))
        })?;
        let links: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            RelayError::Storage(format!("parsing {}: {e}", self.path.display()))
        })?;
        Ok(Some(links))
    }

    async fn save(&self, links: &[String]) -> RelayResult<()> {
        let body = serde_json::to_vec(links)
            .map_err(|e| RelayError::Storage(format!("encoding ledger: {e}")))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                RelayError::Storage(format!("creating {}: {e}", dir.display()))
            })?;
        }

        // Write next to the target, then rename over it.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| RelayError::Storage(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            RelayError::Storage(format!("replacing {}: {e}", self.path.display()))
        })
    }
}

/// Insertion-ordered set of delivered links plus the store it is flushed to.
pub struct LinkLedger {
    order: Vec<String>,
    seen: HashSet<String>,
    store: Box<dyn LedgerStore>,
}

impl std::fmt::Debug for LinkLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkLedger")
            .field("len", &self.order.len())
            .finish()
    }
}

impl LinkLedger {
    /// Empty ledger that will persist into `store`.
    pub fn empty(store: Box<dyn LedgerStore>) -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
            store,
        }
    }

    /// Read persisted state. Missing state yields an empty ledger;
    /// unreadable or corrupt state is a `Storage` error.
    pub fn load(store: Box<dyn LedgerStore>) -> RelayResult<Self> {
        let links = store.load()?.unwrap_or_default();
        let mut ledger = Self::empty(store);
        for link in links {
            ledger.insert(link);
        }
        gauge!("relay_ledger_size").set(ledger.len() as f64);
        Ok(ledger)
    }

    /// Startup policy: a corrupt ledger resets dedup history instead of
    /// halting delivery.
    pub fn load_or_empty(store: Box<dyn LedgerStore>) -> Self {
        let loaded = store.load();
        let mut ledger = Self::empty(store);
        match loaded {
            Ok(links) => {
                for link in links.unwrap_or_default() {
                    ledger.insert(link);
                }
                gauge!("relay_ledger_size").set(ledger.len() as f64);
            }
            Err(e) => {
                tracing::error!(error = %e, "ledger unreadable, starting with empty dedup history");
                counter!("relay_ledger_load_errors_total").increment(1);
            }
        }
        ledger
    }

    pub fn contains(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Links in the order they were delivered.
    pub fn links(&self) -> &[String] {
        &self.order
    }

    /// Add `link` and rewrite the store. The in-memory entry is kept even if
    /// the write fails, so this process will not send it again; only a
    /// restart can.
    pub async fn commit(&mut self, link: &str) -> RelayResult<()> {
        if !self.insert(link.to_string()) {
            return Ok(());
        }
        gauge!("relay_ledger_size").set(self.order.len() as f64);
        self.persist().await
    }

    /// Rewrite the full set to the store.
    pub async fn persist(&self) -> RelayResult<()> {
        self.store.save(&self.order).await.inspect_err(|_| {
            counter!("relay_ledger_persist_errors_total").increment(1);
        })
    }

    fn insert(&mut self, link: String) -> bool {
        if self.seen.insert(link.clone()) {
            self.order.push(link);
            true
        } else {
            false
        }
    }
}
