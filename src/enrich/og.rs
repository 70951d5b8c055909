// src/enrich/og.rs
//! OpenGraph metadata reader.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Url;

use super::{EnrichedItem, MetadataEnricher};
use crate::error::{RelayError, RelayResult};
use crate::news::NewsItem;

const MAX_BODY_BYTES: usize = 512 * 1024;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; crypto-news-relay/0.1)";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OgTags {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Scan the `<head>` of `html` for og:title / og:description / og:image.
/// Falls back to `<title>` for the title. Values are entity-decoded.
pub fn extract_og_tags(html: &str) -> OgTags {
    let head = match find_ascii_ci(html, "</head>") {
        Some(end) => &html[..end],
        None => html,
    };

    static PROP_FIRST: OnceCell<Regex> = OnceCell::new();
    static CONTENT_FIRST: OnceCell<Regex> = OnceCell::new();
    static TITLE_TAG: OnceCell<Regex> = OnceCell::new();

    let prop_first = PROP_FIRST.get_or_init(|| {
        Regex::new(
            r#"(?is)<meta\s+(?:[^>]*?\s)?(?:property|name)\s*=\s*["']og:(\w+)["'][^>]*?\scontent\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#,
        )
        .expect("static og regex")
    });
    let content_first = CONTENT_FIRST.get_or_init(|| {
        Regex::new(
            r#"(?is)<meta\s+(?:[^>]*?\s)?content\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*?\s(?:property|name)\s*=\s*["']og:(\w+)["'][^>]*>"#,
        )
        .expect("static og regex")
    });

    let mut tags = OgTags::default();

    for cap in prop_first.captures_iter(head) {
        let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
        tags.set(&cap[1], value);
    }
    for cap in content_first.captures_iter(head) {
        let value = cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str());
        tags.set(&cap[3], value);
    }

    if tags.title.is_none() {
        let title_re = TITLE_TAG.get_or_init(|| {
            Regex::new(r"(?is)<title[^>]*>([^<]+)</title>").expect("static title regex")
        });
        if let Some(cap) = title_re.captures(head) {
            tags.title = clean(&cap[1]);
        }
    }

    tags
}

impl OgTags {
    fn set(&mut self, key: &str, value: Option<&str>) {
        let Some(value) = value.and_then(clean) else {
            return;
        };
        let slot = match key.to_ascii_lowercase().as_str() {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "image" => &mut self.image,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

fn clean(raw: &str) -> Option<String> {
    let decoded = html_escape::decode_html_entities(raw);
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Resolve `image` against the page URL; anything that is not http(s)
/// afterwards counts as no image.
pub fn absolute_image_url(page: &str, image: &str) -> Option<String> {
    let resolved = match Url::parse(image) {
        Ok(u) => u,
        Err(_) => Url::parse(page).ok()?.join(image).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

pub struct OgEnricher {
    client: reqwest::Client,
}

impl OgEnricher {
    /// `client` carries the per-request timeout.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_head(&self, link: &str) -> Result<String, String> {
        let mut resp = self
            .client
            .get(link)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| e.to_string())? {
            body.extend_from_slice(&chunk);
            if body.len() >= MAX_BODY_BYTES {
                body.truncate(MAX_BODY_BYTES);
                break;
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl MetadataEnricher for OgEnricher {
    async fn resolve(&self, item: &NewsItem) -> RelayResult<EnrichedItem> {
        let html = self.fetch_head(&item.link).await.map_err(|reason| {
            counter!("relay_enrich_failures_total").increment(1);
            RelayError::Enrichment {
                link: item.link.clone(),
                reason,
            }
        })?;

        let tags = extract_og_tags(&html);
        let image = tags
            .image
            .as_deref()
            .and_then(|img| absolute_image_url(&item.link, img));
        tracing::debug!(
            link = %item.link,
            has_title = tags.title.is_some(),
            has_image = image.is_some(),
            "resolved page metadata"
        );

        Ok(EnrichedItem::from_metadata(
            item.clone(),
            tags.title,
            tags.description,
            image,
        ))
    }
}
