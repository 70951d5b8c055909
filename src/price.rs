// src/price.rs
//! `/price` support: CoinGecko market quote plus reply formatting.

use serde::Deserialize;
use strsim::normalized_levenshtein;

use crate::error::{RelayError, RelayResult};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

/// Ticker shorthands accepted by `/price`.
const ALIASES: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("ltc", "litecoin"),
    ("sol", "solana"),
    ("xrp", "ripple"),
    ("doge", "dogecoin"),
    ("ada", "cardano"),
    ("bnb", "binancecoin"),
    ("dot", "polkadot"),
    ("trx", "tron"),
];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MarketQuote {
    pub current_price: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_1h_in_currency: Option<f64>,
    pub market_cap: Option<f64>,
    pub fully_diluted_valuation: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
}

/// Map a ticker shorthand to a CoinGecko id; other names pass through
/// lowercased.
pub fn resolve_coin_id(input: &str) -> String {
    let lower = input.trim().to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, id)| id.to_string())
        .unwrap_or(lower)
}

/// Closest known coin id for a misspelled name, if any is close enough.
pub fn suggest_coin(input: &str) -> Option<&'static str> {
    let lower = input.trim().to_ascii_lowercase();
    ALIASES
        .iter()
        .map(|(_, id)| (*id, normalized_levenshtein(&lower, id)))
        .filter(|(_, score)| *score >= 0.6)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// 1.5B / 2.3M / 4.0K, plain number below a thousand.
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000_000.0 {
        format!("{:.1}B", volume / 1_000_000_000.0)
    } else if volume >= 1_000_000.0 {
        format!("{:.1}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.1}K", volume / 1_000.0)
    } else {
        format!("{volume}")
    }
}

fn num(v: Option<f64>) -> String {
    v.map(|x| format!("{x}")).unwrap_or_else(|| "n/a".to_string())
}

fn pct(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "n/a".to_string())
}

pub fn format_quote(symbol: &str, q: &MarketQuote) -> String {
    format!(
        "{}\nH|L: {}|{}\n1h {}   😕\n24h {}   💸\nCap: {} | {}\nVol: {}",
        symbol.to_ascii_uppercase(),
        num(q.high_24h),
        num(q.low_24h),
        pct(q.price_change_percentage_1h_in_currency),
        pct(q.price_change_percentage_24h),
        num(q.market_cap),
        num(q.fully_diluted_valuation),
        format_volume(q.total_volume.unwrap_or(0.0)),
    )
}

pub struct PriceClient {
    base_url: String,
    client: reqwest::Client,
}

impl PriceClient {
    /// `client` carries the per-request timeout.
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// `Ok(None)` when the coin id is unknown to the API.
    pub async fn quote(&self, coin_id: &str) -> RelayResult<Option<MarketQuote>> {
        let url = format!("{}/api/v3/coins/markets", self.base_url);
        let rows: Vec<MarketQuote> = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd"),
                ("ids", coin_id),
                ("price_change_percentage", "1h"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RelayError::Quote(e.to_string()))?
            .json()
            .await
            .map_err(|e| RelayError::Quote(format!("parsing markets response: {e}")))?;
        Ok(rows.into_iter().next())
    }

    /// Reply text for `/price <arg>`.
    pub async fn reply_for(&self, arg: Option<&str>) -> String {
        let Some(arg) = arg.map(str::trim).filter(|a| !a.is_empty()) else {
            return "Please provide a coin name. Usage: /price <coin_name>".to_string();
        };
        let coin_id = resolve_coin_id(arg);
        match self.quote(&coin_id).await {
            Ok(Some(q)) => format_quote(&coin_id, &q),
            Ok(None) => match suggest_coin(&coin_id) {
                Some(s) if s != coin_id => format!("No data for {coin_id}. Did you mean {s}?"),
                _ => format!("No data for {coin_id}."),
            },
            Err(e) => {
                tracing::warn!(error = %e, coin = %coin_id, "price lookup failed");
                "Error fetching data.".to_string()
            }
        }
    }
}
