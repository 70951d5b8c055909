//! Crypto news relay — binary entrypoint.
//! Boots the relay (ledger, timers, Telegram poller) and serves the Axum
//! health/metrics surface.

use crypto_news_relay::api::{self, AppState};
use crypto_news_relay::app::Relay;
use crypto_news_relay::config::Settings;
use crypto_news_relay::metrics::Metrics;
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    crypto_news_relay::init_tracing();

    let settings = Settings::from_env()?;
    tracing::info!(?settings, "relay settings loaded");

    let metrics = Metrics::init()?;
    let relay = Relay::build(settings)?;
    relay.spawn_background();

    let state = AppState {
        scheduler: relay.scheduler.clone(),
    };
    let router = api::router(state, Some(&metrics));

    Ok(router.into())
}
