// src/scheduler/mod.rs
//! Dedup scheduler: fetch → filter by ledger → enrich → deliver → commit.
//!
//! One cycle holds the state lock from the first ledger check to the last
//! commit, so two overlapping cycles can never both pass `contains` for the
//! same link. Outbound calls are bounded by the HTTP client timeout, which
//! bounds how long a cycle can hold the lock. Readers of the delivered list
//! use a snapshot and never wait on that lock.

pub mod timers;

use std::sync::{Arc, RwLock};

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::sync::Mutex;

use crate::enrich::{EnrichedItem, MetadataEnricher};
use crate::error::RelayResult;
use crate::history::History;
use crate::ledger::LinkLedger;
use crate::news::NewsSource;
use crate::notify::{DeliverySink, DeliveryTarget};
use crate::retry::{DeliveryAttempts, FailureOutcome};

pub use timers::{spawn_sweep_timer, ChatTimers, TimerCfg};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    /// One item per trigger (`/news`, chat timer).
    Manual,
    /// Whole filtered batch (channel timer, `/test_auto_post`).
    Sweep,
}

impl CycleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleKind::Manual => "manual",
            CycleKind::Sweep => "sweep",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub fetch_limit: usize,
    pub max_delivery_attempts: u32,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            fetch_limit: 5,
            max_delivery_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub fetched: usize,
    pub already_sent: usize,
    pub dead_lettered: usize,
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    pub enrich_failed: Vec<String>,
    pub persist_errors: usize,
}

impl CycleReport {
    fn new(kind: CycleKind) -> Self {
        Self {
            kind,
            fetched: 0,
            already_sent: 0,
            dead_lettered: 0,
            delivered: Vec::new(),
            failed: Vec::new(),
            enrich_failed: Vec::new(),
            persist_errors: 0,
        }
    }
}

/// The external collaborators a cycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn NewsSource>,
    pub enricher: Arc<dyn MetadataEnricher>,
    pub sink: Arc<dyn DeliverySink>,
}

struct CycleState {
    ledger: LinkLedger,
    attempts: DeliveryAttempts,
}

pub struct DedupScheduler {
    parts: Collaborators,
    state: Mutex<CycleState>,
    channel: DeliveryTarget,
    cfg: SchedulerCfg,
    history: Arc<History>,
    /// Copy of the ledger order, appended under the cycle lock.
    delivered: RwLock<Vec<String>>,
}

impl DedupScheduler {
    pub fn new(
        parts: Collaborators,
        ledger: LinkLedger,
        channel: DeliveryTarget,
        cfg: SchedulerCfg,
    ) -> Self {
        let delivered = RwLock::new(ledger.links().to_vec());
        Self {
            parts,
            state: Mutex::new(CycleState {
                ledger,
                attempts: DeliveryAttempts::new(cfg.max_delivery_attempts),
            }),
            channel,
            cfg,
            history: Arc::new(History::with_capacity(200)),
            delivered,
        }
    }

    pub fn channel(&self) -> &DeliveryTarget {
        &self.channel
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    /// One item to the requesting chat and the channel.
    pub async fn manual_cycle(&self, chat_id: i64) -> CycleReport {
        let targets = [DeliveryTarget::chat(chat_id), self.channel.clone()];
        self.run_cycle(CycleKind::Manual, &targets).await
    }

    /// Every new item, channel only.
    pub async fn sweep_cycle(&self) -> CycleReport {
        let targets = [self.channel.clone()];
        self.run_cycle(CycleKind::Sweep, &targets).await
    }

    /// Delivered links in delivery order. Does not wait for a running cycle.
    pub fn ledger_links(&self) -> Vec<String> {
        self.delivered
            .read()
            .expect("delivered snapshot poisoned")
            .clone()
    }

    pub async fn run_cycle(&self, kind: CycleKind, targets: &[DeliveryTarget]) -> CycleReport {
        counter!("relay_cycles_total", "kind" => kind.as_str()).increment(1);
        let mut report = CycleReport::new(kind);

        if targets.is_empty() {
            tracing::warn!(kind = kind.as_str(), "cycle without targets skipped");
            return self.finish(report);
        }

        let candidates = match self.parts.source.fetch_latest(self.cfg.fetch_limit).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    source = self.parts.source.name(),
                    kind = kind.as_str(),
                    "fetch failed, no new items this cycle"
                );
                counter!("relay_fetch_errors_total").increment(1);
                return self.finish(report);
            }
        };
        report.fetched = candidates.len();

        let mut state = self.state.lock().await;
        for item in candidates {
            let link = item.link.clone();
            if state.ledger.contains(&link) {
                report.already_sent += 1;
                continue;
            }
            if !state.attempts.should_attempt(&link) {
                report.dead_lettered += 1;
                continue;
            }

            let enriched = match self.parts.enricher.resolve(&item).await {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, link = %link, "enrichment failed, will retry next cycle");
                    report.enrich_failed.push(link);
                    continue;
                }
            };

            match self.deliver_all(targets, &enriched).await {
                Ok(()) => {
                    state.attempts.record_success(&link);
                    if let Err(e) = state.ledger.commit(&link).await {
                        tracing::error!(error = %e, link = %link, "delivered but ledger not persisted");
                        report.persist_errors += 1;
                    }
                    self.delivered
                        .write()
                        .expect("delivered snapshot poisoned")
                        .push(link.clone());
                    counter!("relay_delivered_total").increment(1);
                    tracing::info!(link = %link, kind = kind.as_str(), "news item delivered");
                    report.delivered.push(link);
                    if kind == CycleKind::Manual {
                        break;
                    }
                }
                Err(e) => {
                    match state.attempts.record_failure(&link) {
                        FailureOutcome::WillRetry { failures } => {
                            tracing::warn!(error = %e, link = %link, failures, "delivery failed, will retry");
                        }
                        FailureOutcome::DeadLettered => {
                            tracing::warn!(error = %e, link = %link, "delivery failed too often, giving up on item");
                            counter!("relay_dead_letter_total").increment(1);
                        }
                    }
                    report.failed.push(link);
                }
            }
        }
        drop(state);

        self.finish(report)
    }

    /// Targets in order; the first failure stops the item.
    async fn deliver_all(&self, targets: &[DeliveryTarget], item: &EnrichedItem) -> RelayResult<()> {
        for target in targets {
            self.parts.sink.deliver(target, item).await?;
            tracing::debug!(link = %item.link(), target = %target, "sent");
        }
        Ok(())
    }

    fn finish(&self, report: CycleReport) -> CycleReport {
        gauge!("relay_last_cycle_ts").set(Utc::now().timestamp().max(0) as f64);
        tracing::info!(
            kind = report.kind.as_str(),
            fetched = report.fetched,
            already_sent = report.already_sent,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            enrich_failed = report.enrich_failed.len(),
            "cycle finished"
        );
        self.history.push(&report);
        report
    }
}
