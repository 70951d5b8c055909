// src/bot.rs
//! Telegram long-polling loop feeding chat commands to the handlers.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;

use crate::commands::{parse_command, CommandHandlers};
use crate::notify::telegram::{TelegramClient, Update};

/// Offset to ask for next: one past the highest update seen.
pub fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .map_or(current, |n| n.max(current))
}

pub async fn run_poller(
    client: TelegramClient,
    handlers: Arc<CommandHandlers>,
    poll_timeout_secs: u64,
) {
    let mut offset: i64 = 0;
    let mut backoff = Duration::from_secs(1);

    loop {
        let updates = match client.get_updates(offset, poll_timeout_secs).await {
            Ok(u) => {
                backoff = Duration::from_secs(1);
                u
            }
            Err(e) => {
                tracing::warn!("poller tick failed: {e:#}");
                counter!("relay_poll_errors_total").increment(1);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(60));
                continue;
            }
        };
        offset = next_offset(offset, &updates);

        for update in updates {
            let Some(msg) = update.message else {
                continue;
            };
            let Some(cmd) = msg.text.as_deref().and_then(parse_command) else {
                tracing::trace!(chat_id = msg.chat.id, "non-command message");
                continue;
            };
            counter!("relay_commands_total").increment(1);

            // Each command runs on its own task; /news may wait on a cycle.
            let chat_id = msg.chat.id;
            let client = client.clone();
            let handlers = handlers.clone();
            tokio::spawn(async move {
                for reply in handlers.handle(chat_id, cmd).await {
                    if let Err(e) = client.reply(chat_id, &reply).await {
                        tracing::warn!(error = %e, chat_id, "reply failed");
                    }
                }
            });
        }
    }
}
