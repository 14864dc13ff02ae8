use std::sync::Arc;

use tracing::{trace, warn};

use tunebot_common::models::{ChannelId, MessageId};
use tunebot_common::traits::ChatGateway;

use crate::services::command_service::Reply;
use crate::Error;

/// Maximum length of a single Discord message.
pub const DISCORD_MAX_MSG_LENGTH: usize = 2000;

/// Split `message` into chunks of at most `max_len` bytes, breaking on line
/// boundaries where possible. A single line longer than the limit is cut at
/// the last char boundary that fits.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut segments = Vec::new();
    let mut current = String::new();

    for line in message.split('\n') {
        let needed = if current.is_empty() { line.len() } else { current.len() + 1 + line.len() };
        if needed <= max_len {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            continue;
        }

        if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }

        let mut rest = line;
        while rest.len() > max_len {
            let mut cut = max_len;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            segments.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Delivers command replies to the chat.
pub struct MessageSender {
    gateway: Arc<dyn ChatGateway>,
}

impl MessageSender {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    pub async fn deliver(&self, channel_id: ChannelId, message_id: MessageId, reply: Reply) -> Result<(), Error> {
        match reply {
            Reply::Text(text) => {
                let segments = split_message(&text, DISCORD_MAX_MSG_LENGTH);
                if segments.len() > 1 {
                    trace!("Reply in channel {channel_id} split into {} messages", segments.len());
                }
                for segment in segments {
                    self.gateway.send_message(channel_id, &segment).await?;
                }
                Ok(())
            }
            Reply::React(emoji) => self.gateway.react(channel_id, message_id, emoji).await,
            Reply::Silent => Ok(()),
        }
    }

    /// Like [`MessageSender::deliver`], but only logs failures.
    pub async fn deliver_logged(&self, channel_id: ChannelId, message_id: MessageId, reply: Reply) {
        if let Err(e) = self.deliver(channel_id, message_id, reply).await {
            warn!("Could not deliver reply to channel {channel_id}: {e}");
        }
    }
}
