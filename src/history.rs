//! history.rs — bounded in-memory log of recent cycle reports for /debug/cycles.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::scheduler::{CycleKind, CycleReport};

#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryEntry {
    pub ts_unix: u64,
    pub kind: CycleKind,
    pub fetched: usize,
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<HistoryEntry>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, r: &CycleReport) {
        let entry = HistoryEntry {
            ts_unix: now_unix(),
            kind: r.kind,
            fetched: r.fetched,
            delivered: r.delivered.clone(),
            failed: r.failed.clone(),
        };

        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<HistoryEntry> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let len = v.len();
        let start = len.saturating_sub(n);
        v[start..].to_vec()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
