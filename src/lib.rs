// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod app;
pub mod bot;
pub mod commands;
pub mod config;
pub mod enrich;
pub mod error;
pub mod history;
pub mod ledger;
pub mod metrics;
pub mod news;
pub mod notify;
pub mod price;
pub mod retry;
pub mod scheduler;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::error::{RelayError, RelayResult};
pub use crate::scheduler::{CycleKind, CycleReport, DedupScheduler};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the tracing subscriber. `RUST_LOG` overrides the default filter,
/// `LOG_FORMAT=json` switches to JSON lines. A no-op when a subscriber is
/// already installed (the Shuttle runtime brings its own).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_news_relay=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
