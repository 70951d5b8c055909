// src/news/types.rs
use crate::error::RelayResult;

pub const NO_SUMMARY: &str = "No summary available.";

/// One candidate as returned by the news source. `link` is its identity.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub link: String,
    pub title: String,
    pub summary: String,
    pub image_hint: Option<String>, // e.g. "coindesk.com/favicon.ico"
}

#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// Most-recent-first, source order preserved, at most `limit` items.
    async fn fetch_latest(&self, limit: usize) -> RelayResult<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}
