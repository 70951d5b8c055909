use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the relay series.
    pub fn init() -> anyhow::Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        describe_relay_metrics();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe_relay_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_cycles_total", "Scheduler cycles run, by kind.");
        describe_counter!("relay_delivered_total", "Items delivered to every target and committed.");
        describe_counter!("relay_delivery_failures_total", "Bot API sends that failed.");
        describe_counter!("relay_enrich_failures_total", "Article pages that could not be fetched.");
        describe_counter!("relay_fetch_errors_total", "News source fetch/parse errors.");
        describe_counter!("relay_fetched_items_total", "Candidates returned by the news source.");
        describe_counter!("relay_dead_letter_total", "Items given up after repeated delivery failures.");
        describe_counter!("relay_ledger_persist_errors_total", "Ledger writes that failed.");
        describe_counter!("relay_ledger_load_errors_total", "Ledger loads that fell back to empty.");
        describe_counter!("relay_commands_total", "Chat commands received.");
        describe_counter!("relay_poll_errors_total", "getUpdates failures.");
        describe_histogram!("relay_fetch_parse_ms", "News source parse time in milliseconds.");
        describe_gauge!("relay_ledger_size", "Links in the ledger.");
        describe_gauge!("relay_last_cycle_ts", "Unix ts when a cycle last finished.");
    });
}
