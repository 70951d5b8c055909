// src/config/relay.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::ledger::DEFAULT_LEDGER_PATH;

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

fn default_sweep_interval() -> u64 {
    300
}
fn default_chat_interval() -> u64 {
    30
}
fn default_first_delay() -> u64 {
    1
}
fn default_fetch_limit() -> usize {
    5
}
fn default_http_timeout() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_footer_label() -> Option<String> {
    Some("Airdrop Channel".to_string())
}
fn default_footer_url() -> Option<String> {
    Some("https://t.me/magical_alpha".to_string())
}
fn default_news_base() -> String {
    crate::news::cryptopanic::DEFAULT_BASE_URL.to_string()
}
fn default_telegram_base() -> String {
    crate::notify::telegram::DEFAULT_API_BASE.to_string()
}
fn default_price_base() -> String {
    crate::price::DEFAULT_BASE_URL.to_string()
}

/// Tunables from `config/relay.toml`. Every field has a default, so an
/// absent file is fine.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Tunables {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_chat_interval")]
    pub chat_interval_secs: u64,
    #[serde(default = "default_first_delay")]
    pub first_delay_secs: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_delivery_attempts: u32,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_footer_label")]
    pub footer_label: Option<String>,
    #[serde(default = "default_footer_url")]
    pub footer_url: Option<String>,
    #[serde(default = "default_news_base")]
    pub news_api_base: String,
    #[serde(default = "default_telegram_base")]
    pub telegram_api_base: String,
    #[serde(default = "default_price_base")]
    pub price_api_base: String,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            chat_interval_secs: default_chat_interval(),
            first_delay_secs: default_first_delay(),
            fetch_limit: default_fetch_limit(),
            http_timeout_secs: default_http_timeout(),
            max_delivery_attempts: default_max_attempts(),
            poll_timeout_secs: default_poll_timeout(),
            footer_label: default_footer_label(),
            footer_url: default_footer_url(),
            news_api_base: default_news_base(),
            telegram_api_base: default_telegram_base(),
            price_api_base: default_price_base(),
        }
    }
}

impl Tunables {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut t: Tunables = toml::from_str(s).context("parsing relay tunables")?;
        t.sanitize();
        Ok(t)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// 1) $RELAY_CONFIG_PATH (must exist)
    /// 2) config/relay.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    fn sanitize(&mut self) {
        self.sweep_interval_secs = self.sweep_interval_secs.max(1);
        self.chat_interval_secs = self.chat_interval_secs.max(1);
        self.fetch_limit = self.fetch_limit.max(1);
        self.http_timeout_secs = self.http_timeout_secs.max(1);
        self.max_delivery_attempts = self.max_delivery_attempts.max(1);
        // An empty footer field disables the footer.
        if self.footer_label.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.footer_label = None;
        }
        if self.footer_url.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.footer_url = None;
        }
    }
}

/// Process-wide settings, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub telegram_bot_token: String,
    pub cryptopanic_api_key: String,
    pub channel: String,
    pub ledger_path: PathBuf,
    pub tunables: Tunables,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Safe diagnostics: lengths only for secrets.
        f.debug_struct("Settings")
            .field("telegram_bot_token_len", &self.telegram_bot_token.len())
            .field("cryptopanic_api_key_len", &self.cryptopanic_api_key.len())
            .field("channel", &self.channel)
            .field("ledger_path", &self.ledger_path)
            .field("tunables", &self.tunables)
            .finish()
    }
}

fn required(name: &str) -> Result<String> {
    let v = env::var(name).map_err(|_| anyhow!("Missing {name} env var"))?;
    if v.trim().is_empty() {
        return Err(anyhow!("{name} env var is empty"));
    }
    Ok(v.trim().to_string())
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let tunables = Tunables::load_default()?;
        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            cryptopanic_api_key: required("CRYPTOPANIC_API_KEY")?,
            channel: required("CHANNEL_USERNAME")?,
            ledger_path: env::var("LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEDGER_PATH)),
            tunables,
        })
    }
}
