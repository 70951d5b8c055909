// src/api.rs
//! Small HTTP surface: health, metrics and read-only debug views.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::cors::CorsLayer;

use crate::history::HistoryEntry;
use crate::metrics::Metrics;
use crate::scheduler::DedupScheduler;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<DedupScheduler>,
}

pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/debug/ledger", get(debug_ledger))
        .route("/debug/cycles", get(debug_cycles))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

async fn debug_ledger(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.scheduler.ledger_links())
}

async fn debug_cycles(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.scheduler.history().snapshot_last_n(50))
}
