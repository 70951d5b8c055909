// src/notify/telegram.rs
//! Thin Telegram Bot API client (sendPhoto, sendMessage, getUpdates) and the
//! news delivery sink built on it.

use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{outbound_for, DeliverySink, DeliveryTarget, FooterLink, Outbound};
use crate::enrich::EnrichedItem;
use crate::error::{RelayError, RelayResult};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "Markdown";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone)]
pub struct TelegramClient {
    api_base: String,
    token: String,
    client: reqwest::Client,
    max_retries: u8,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// `client` carries the default per-request timeout.
    pub fn new(api_base: &str, token: &str, client: reqwest::Client) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            max_retries: 3,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// POST a Bot API method. Connection failures (nothing reached Telegram)
    /// are retried with backoff; API rejections are returned at once.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, String> {
        let url = self.method_url(method);
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let mut req = self.client.post(&url).json(body);
            if let Some(t) = timeout {
                req = req.timeout(t);
            }

            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) if e.is_connect() && attempt < self.max_retries => {
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                    continue;
                }
                // Strip the URL: it contains the bot token.
                Err(e) => return Err(format!("{method} request failed: {}", e.without_url())),
            };

            let status = resp.status();
            let parsed: ApiResponse<T> = resp
                .json()
                .await
                .map_err(|e| format!("{method} response ({status}): {}", e.without_url()))?;

            if parsed.ok {
                return parsed
                    .result
                    .ok_or_else(|| format!("{method} returned ok without result"));
            }

            let mut reason = parsed
                .description
                .unwrap_or_else(|| format!("{method} rejected with {status}"));
            if let Some(secs) = parsed.parameters.and_then(|p| p.retry_after) {
                reason.push_str(&format!(" (retry after {secs}s)"));
            }
            return Err(reason);
        }
    }

    pub async fn send_photo(&self, chat_id: &str, photo: &str, caption: &str) -> RelayResult<()> {
        let body = json!({
            "chat_id": chat_id,
            "photo": photo,
            "caption": caption,
            "parse_mode": PARSE_MODE,
        });
        self.call::<Value>("sendPhoto", &body, None)
            .await
            .map(|_| ())
            .map_err(|reason| delivery_error(chat_id, reason))
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
        disable_preview: bool,
    ) -> RelayResult<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "link_preview_options": { "is_disabled": disable_preview },
        });
        if markdown {
            body["parse_mode"] = Value::String(PARSE_MODE.to_string());
        }
        self.call::<Value>("sendMessage", &body, None)
            .await
            .map(|_| ())
            .map_err(|reason| delivery_error(chat_id, reason))
    }

    /// Plain-text reply to a command.
    pub async fn reply(&self, chat_id: i64, text: &str) -> RelayResult<()> {
        self.send_message(&chat_id.to_string(), text, false, true)
            .await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, poll_timeout_secs: u64) -> anyhow::Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        // The request must outlive the server-side long poll.
        let timeout = Duration::from_secs(poll_timeout_secs + 10);
        self.call::<Vec<Update>>("getUpdates", &body, Some(timeout))
            .await
            .map_err(|reason| anyhow::anyhow!("getUpdates: {reason}"))
    }
}

fn delivery_error(chat_id: &str, reason: String) -> RelayError {
    RelayError::Delivery {
        destination: chat_id.to_string(),
        reason,
    }
}

/// Delivers enriched news through the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    client: TelegramClient,
    footer: Option<FooterLink>,
}

impl TelegramSink {
    pub fn new(client: TelegramClient, footer: Option<FooterLink>) -> Self {
        Self { client, footer }
    }
}

#[async_trait::async_trait]
impl DeliverySink for TelegramSink {
    async fn deliver(&self, target: &DeliveryTarget, item: &EnrichedItem) -> RelayResult<()> {
        let res = match outbound_for(target, item, self.footer.as_ref()) {
            Outbound::Photo {
                chat_id,
                photo,
                caption,
            } => self.client.send_photo(&chat_id, &photo, &caption).await,
            Outbound::Text {
                chat_id,
                text,
                disable_preview,
            } => {
                self.client
                    .send_message(&chat_id, &text, true, disable_preview)
                    .await
            }
        };
        if res.is_err() {
            counter!("relay_delivery_failures_total").increment(1);
        }
        res
    }
}
