use async_trait::async_trait;

use crate::error::Error;
use crate::models::{ChannelId, MessageId};

/// Outgoing side of the chat platform connection.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), Error>;

    async fn react(&self, channel_id: ChannelId, message_id: MessageId, emoji: &str) -> Result<(), Error>;
}
