// src/notify/mod.rs
//! Delivery sinks and message rendering.

pub mod telegram;

use crate::enrich::{DeliveryShape, EnrichedItem};
use crate::error::RelayResult;

pub use telegram::{TelegramClient, TelegramSink};

pub const CAPTION_LIMIT: usize = 1024;
pub const TEXT_LIMIT: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    DirectChat,
    BroadcastChannel,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct DeliveryTarget {
    pub kind: TargetKind,
    /// Chat id ("12345") or channel username ("@name").
    pub destination: String,
}

impl DeliveryTarget {
    pub fn chat(chat_id: i64) -> Self {
        Self {
            kind: TargetKind::DirectChat,
            destination: chat_id.to_string(),
        }
    }

    pub fn channel(destination: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::BroadcastChannel,
            destination: destination.into(),
        }
    }
}

impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TargetKind::DirectChat => write!(f, "chat:{}", self.destination),
            TargetKind::BroadcastChannel => write!(f, "channel:{}", self.destination),
        }
    }
}

#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, target: &DeliveryTarget, item: &EnrichedItem) -> RelayResult<()>;
}

/// Optional trailing link appended after "Read More".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterLink {
    pub label: String,
    pub url: String,
}

/// What actually goes over the wire for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Photo {
        chat_id: String,
        photo: String,
        caption: String,
    },
    Text {
        chat_id: String,
        text: String,
        /// Always true for news posts: the enrichment is the preview.
        disable_preview: bool,
    },
}

/// Render `item` for `target`, choosing the Bot API call from the shape.
pub fn outbound_for(
    target: &DeliveryTarget,
    item: &EnrichedItem,
    footer: Option<&FooterLink>,
) -> Outbound {
    match &item.shape {
        DeliveryShape::WithImage { image_url } => Outbound::Photo {
            chat_id: target.destination.clone(),
            photo: image_url.clone(),
            caption: compose_message(item, footer, CAPTION_LIMIT),
        },
        DeliveryShape::TextOnly => Outbound::Text {
            chat_id: target.destination.clone(),
            text: compose_message(item, footer, TEXT_LIMIT),
            disable_preview: true,
        },
    }
}

/// `📰 {title}\n\n{description}\n\n[Read More]({link})[ | [label](url)]`,
/// with the description shortened so the whole thing fits in `limit` chars.
/// Text parts are escaped for the legacy Markdown parse mode.
pub fn compose_message(item: &EnrichedItem, footer: Option<&FooterLink>, limit: usize) -> String {
    let mut links = format!("[Read More]({})", markdown_url(item.link()));
    if let Some(f) = footer {
        links.push_str(&format!(
            " | [{}]({})",
            escape_markdown(&f.label),
            markdown_url(&f.url)
        ));
    }
    let head = format!("📰 {}\n\n", escape_markdown(&item.title));
    let tail = format!("\n\n{links}");

    let fixed = head.chars().count() + tail.chars().count();
    let room = limit.saturating_sub(fixed);
    let description = escape_truncated(&item.description, room);

    format!("{head}{description}{tail}")
}

fn is_markdown_special(c: char) -> bool {
    matches!(c, '_' | '*' | '`' | '[')
}

/// Backslash-escape the characters legacy Markdown treats as entity markers.
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_markdown_special(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A `)` would end the link target early.
fn markdown_url(url: &str) -> String {
    url.replace(')', "%29")
}

/// Escaped `s` in at most `max` chars. Cuts only between source chars, so an
/// escape pair is never split, and marks the cut with `…`.
fn escape_truncated(s: &str, max: usize) -> String {
    let escaped = escape_markdown(s);
    if escaped.chars().count() <= max {
        return escaped;
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let width = if is_markdown_special(c) { 2 } else { 1 };
        if used + width > max - 1 {
            break;
        }
        if is_markdown_special(c) {
            out.push('\\');
        }
        out.push(c);
        used += width;
    }
    out.push('…');
    out
}
