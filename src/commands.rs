// src/commands.rs
//! Chat command parsing and handlers. Handlers return reply texts; the
//! poller sends them.

use std::sync::Arc;

use crate::notify::TEXT_LIMIT;
use crate::price::PriceClient;
use crate::scheduler::{ChatTimers, DedupScheduler};

pub const GREETING: &str =
    "Hello! I'll keep you updated on Bitcoin price alerts and the latest crypto news.";
pub const NO_PREVIOUS: &str = "No previous news available.";
pub const NOTHING_NEW: &str = "No new news right now.";

pub const HELP_TEXT: &str = "Available commands:\n\
/start - Start the bot and receive updates.\n\
/stop - Stop the updates started with /start.\n\
/help - Show this help message.\n\
/news - Get the latest news.\n\
/previous_news - Get the Previous news.\n\
/test_auto_post - Test auto post.\n\
/price <coin_name> - Get price";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Help,
    News,
    PreviousNews,
    TestAutoPost,
    Price(Option<String>),
    Unknown(String),
}

/// `None` for plain text; `/cmd@BotName arg` is accepted.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next()?;
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    let arg = parts.next().map(str::to_string);

    Some(match name.as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "help" => Command::Help,
        "news" => Command::News,
        "previous_news" => Command::PreviousNews,
        "test_auto_post" => Command::TestAutoPost,
        "price" => Command::Price(arg),
        _ => Command::Unknown(name),
    })
}

/// "Previous News:" followed by the links separated by blank lines, split
/// into messages that fit the platform limit. A link longer than one message
/// is cut across messages.
pub fn render_previous_news(links: &[String]) -> Vec<String> {
    const HEADER: &str = "Previous News:\n";
    if links.is_empty() {
        return vec![format!("{HEADER}{NO_PREVIOUS}")];
    }

    let max_piece = TEXT_LIMIT - HEADER.len();
    let mut out = Vec::new();
    let mut current = String::from(HEADER);
    let mut current_len = HEADER.len();
    let mut first = true;
    for link in links {
        let chars: Vec<char> = link.chars().collect();
        for (i, piece) in chars.chunks(max_piece).enumerate() {
            let sep = if first || i > 0 { "" } else { "\n\n" };
            first = false;
            if current_len + sep.len() + piece.len() > TEXT_LIMIT {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            } else {
                current.push_str(sep);
                current_len += sep.len();
            }
            current.extend(piece);
            current_len += piece.len();
        }
    }
    out.push(current);
    out
}

pub struct CommandHandlers {
    scheduler: Arc<DedupScheduler>,
    chat_timers: Arc<ChatTimers>,
    price: Arc<PriceClient>,
}

impl CommandHandlers {
    pub fn new(
        scheduler: Arc<DedupScheduler>,
        chat_timers: Arc<ChatTimers>,
        price: Arc<PriceClient>,
    ) -> Self {
        Self {
            scheduler,
            chat_timers,
            price,
        }
    }

    pub async fn handle(&self, chat_id: i64, cmd: Command) -> Vec<String> {
        tracing::info!(chat_id, command = ?cmd, "command triggered");
        match cmd {
            Command::Start => {
                if self.chat_timers.start(chat_id) {
                    tracing::debug!(chat_id, "replaced running chat timer");
                }
                vec![GREETING.to_string()]
            }
            Command::Stop => {
                if self.chat_timers.stop(chat_id) {
                    vec!["Updates stopped.".to_string()]
                } else {
                    vec!["No updates were running. Use /start to begin.".to_string()]
                }
            }
            Command::Help => vec![HELP_TEXT.to_string()],
            Command::News => {
                let report = self.scheduler.manual_cycle(chat_id).await;
                if report.delivered.is_empty() {
                    vec![NOTHING_NEW.to_string()]
                } else {
                    Vec::new()
                }
            }
            Command::PreviousNews => {
                render_previous_news(&self.scheduler.ledger_links())
            }
            Command::TestAutoPost => {
                let report = self.scheduler.sweep_cycle().await;
                vec![format!(
                    "Auto post done: {} delivered, {} failed.",
                    report.delivered.len(),
                    report.failed.len()
                )]
            }
            Command::Price(arg) => vec![self.price.reply_for(arg.as_deref()).await],
            Command::Unknown(name) => {
                tracing::debug!(chat_id, command = %name, "unknown command ignored");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix_and_args() {
        assert_eq!(parse_command("/news@relay_bot"), Some(Command::News));
        assert_eq!(
            parse_command("/price ETH"),
            Some(Command::Price(Some("ETH".into())))
        );
        assert_eq!(parse_command("/price"), Some(Command::Price(None)));
        assert_eq!(parse_command("/Previous_News"), Some(Command::PreviousNews));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(
            parse_command("/foo"),
            Some(Command::Unknown("foo".into()))
        );
    }

    #[test]
    fn previous_news_empty_and_joined() {
        assert_eq!(
            render_previous_news(&[]),
            vec!["Previous News:\nNo previous news available.".to_string()]
        );
        let links = vec!["https://a/1".to_string(), "https://a/2".to_string()];
        assert_eq!(
            render_previous_news(&links),
            vec!["Previous News:\nhttps://a/1\n\nhttps://a/2".to_string()]
        );
    }

    #[test]
    fn previous_news_is_chunked() {
        let links: Vec<String> = (0..200)
            .map(|i| format!("https://news.example/articles/{i:04}/some-long-slug"))
            .collect();
        let chunks = render_previous_news(&links);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= TEXT_LIMIT));
        assert!(chunks[0].starts_with("Previous News:\n"));
        let total: usize = chunks
            .iter()
            .map(|c| c.matches("https://").count())
            .sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn oversized_link_is_split_across_messages() {
        let huge = format!("https://news.example/{}", "a".repeat(5000));
        let links = vec!["https://a/1".to_string(), huge.clone()];
        let chunks = render_previous_news(&links);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= TEXT_LIMIT));
        assert_eq!(chunks[0], "Previous News:\nhttps://a/1");
        assert_eq!(chunks[1..].concat(), huge);
    }

    #[test]
    fn oversized_first_link_still_fits() {
        let huge = "x".repeat(TEXT_LIMIT * 2);
        let chunks = render_previous_news(&[huge.clone()]);
        assert!(chunks.iter().all(|c| c.chars().count() <= TEXT_LIMIT));
        assert_eq!(chunks.concat(), format!("Previous News:\n{huge}"));
    }
}
