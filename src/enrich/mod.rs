// src/enrich/mod.rs
//! Metadata enrichment: turn a fetched item into what gets displayed.

pub mod og;

use crate::error::RelayResult;
use crate::news::NewsItem;

pub use og::OgEnricher;

pub const NO_TITLE: &str = "No Title Available";
pub const NO_DESCRIPTION: &str = "No description available.";

/// How an item is delivered. Decided here so sinks never branch on raw
/// optional fields.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum DeliveryShape {
    WithImage { image_url: String },
    TextOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EnrichedItem {
    pub item: NewsItem,
    pub title: String,
    pub description: String,
    pub shape: DeliveryShape,
}

impl EnrichedItem {
    /// Apply the placeholder rules to whatever metadata was found.
    pub fn from_metadata(
        item: NewsItem,
        title: Option<String>,
        description: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string());
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        let shape = match image_url {
            Some(image_url) => DeliveryShape::WithImage { image_url },
            None => DeliveryShape::TextOnly,
        };
        Self {
            item,
            title,
            description,
            shape,
        }
    }

    pub fn link(&self) -> &str {
        &self.item.link
    }
}

#[async_trait::async_trait]
pub trait MetadataEnricher: Send + Sync {
    /// Best effort: only a failure to fetch the page at all is an error.
    async fn resolve(&self, item: &NewsItem) -> RelayResult<EnrichedItem>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> NewsItem {
        NewsItem {
            link: "https://n.example/a".into(),
            title: "t".into(),
            summary: "s".into(),
            image_hint: None,
        }
    }

    #[test]
    fn placeholders_and_shape() {
        let e = EnrichedItem::from_metadata(item(), None, Some(" ".into()), None);
        assert_eq!(e.title, NO_TITLE);
        assert_eq!(e.description, NO_DESCRIPTION);
        assert_eq!(e.shape, DeliveryShape::TextOnly);

        let e = EnrichedItem::from_metadata(
            item(),
            Some("Title".into()),
            None,
            Some("https://img.example/a.png".into()),
        );
        assert_eq!(
            e.shape,
            DeliveryShape::WithImage {
                image_url: "https://img.example/a.png".into()
            }
        );
    }
}
