//! Runs a single channel sweep and exits. Useful to check credentials and
//! the ledger path without starting the long-running service.

use crypto_news_relay::app::Relay;
use crypto_news_relay::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    crypto_news_relay::init_tracing();

    let relay = Relay::build(Settings::from_env()?)?;
    let report = relay.scheduler.sweep_cycle().await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
