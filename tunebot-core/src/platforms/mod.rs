// File: src/platforms/mod.rs

use async_trait::async_trait;

use tunebot_common::models::{ChannelId, GuildId};

use crate::Error;

/// Voice signalling on the chat platform: ask the gateway to move the bot in
/// or out of a voice channel. The audio itself never passes through here.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), Error>;
    async fn leave(&self, guild_id: GuildId) -> Result<(), Error>;
}

pub mod discord;
