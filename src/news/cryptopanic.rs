// src/news/cryptopanic.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::error::{RelayError, RelayResult};
use crate::news::types::{NewsItem, NewsSource, NO_SUMMARY};

pub const DEFAULT_BASE_URL: &str = "https://cryptopanic.com";

#[derive(Debug, Deserialize)]
struct PostsPage {
    #[serde(default)]
    results: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    source: Option<PostSource>,
}

#[derive(Debug, Deserialize)]
struct PostSource {
    domain: Option<String>,
}

pub struct CryptoPanicSource {
    mode: Mode,
}

enum Mode {
    // Owned copy of a canned response body (tests, dry runs).
    Fixture(String),
    Http {
        base_url: String,
        auth_token: String,
        client: reqwest::Client,
    },
}

impl CryptoPanicSource {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    /// `client` carries the per-request timeout.
    pub fn new(base_url: &str, auth_token: &str, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                auth_token: auth_token.to_string(),
                client,
            },
        }
    }

    /// Parse a posts page, keep source order, drop entries without a link.
    pub fn parse_posts(body: &str, limit: usize) -> RelayResult<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let page: PostsPage = serde_json::from_str(body)
            .map_err(|e| RelayError::Fetch(format!("parsing cryptopanic posts: {e}")))?;

        let mut out = Vec::with_capacity(limit.min(page.results.len()));
        for post in page.results {
            if out.len() >= limit {
                break;
            }
            let Some(link) = post.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
            else {
                continue;
            };
            let summary = post
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| NO_SUMMARY.to_string());
            let image_hint = post
                .source
                .and_then(|s| s.domain)
                .filter(|d| !d.is_empty())
                .map(|d| format!("{d}/favicon.ico"));

            out.push(NewsItem {
                link,
                title: post.title.unwrap_or_default(),
                summary,
                image_hint,
            });
        }

        histogram!("relay_fetch_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("relay_fetched_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl NewsSource for CryptoPanicSource {
    async fn fetch_latest(&self, limit: usize) -> RelayResult<Vec<NewsItem>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_posts(body, limit),
            Mode::Http {
                base_url,
                auth_token,
                client,
            } => {
                let url = format!("{base_url}/api/v1/posts/");
                let resp = client
                    .get(&url)
                    .query(&[("auth_token", auth_token.as_str()), ("public", "true")])
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| {
                        // Do not leak the token that reqwest puts in the URL.
                        RelayError::Fetch(format!("cryptopanic request: {}", e.without_url()))
                    })?;
                let body = resp
                    .text()
                    .await
                    .map_err(|e| RelayError::Fetch(format!("cryptopanic body: {e}")))?;
                tracing::debug!(bytes = body.len(), "fetched cryptopanic posts");
                Self::parse_posts(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "CryptoPanic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back() {
        let body = r#"{"results":[
            {"title":"No link here","source":{"domain":"x.com"}},
            {"title":"Kept","url":"https://n.example/a","description":"  ","source":{"domain":"n.example"}},
            {"title":"No source","url":"https://n.example/b"}
        ]}"#;
        let items = CryptoPanicSource::parse_posts(body, 5).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].summary, NO_SUMMARY);
        assert_eq!(items[0].image_hint.as_deref(), Some("n.example/favicon.ico"));
        assert_eq!(items[1].image_hint, None);
    }

    #[test]
    fn malformed_body_is_fetch_error() {
        let err = CryptoPanicSource::parse_posts("<html>", 5).unwrap_err();
        assert_eq!(err.kind(), "fetch");
    }
}
