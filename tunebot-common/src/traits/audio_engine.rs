use async_trait::async_trait;

use crate::error::Error;
use crate::models::{ChannelId, Filters, GuildId, Track};

/// Control plane of the external audio node.
///
/// Everything that touches real audio (searching sources, decoding, the voice
/// transport) happens on the other side of this trait; the bot only steers.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Resolve an identifier (URL or `source:query`) into playable tracks.
    /// An empty result is not an error.
    async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, Error>;

    /// Join `channel_id` in `guild_id` and hand the voice connection to the node.
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), Error>;

    /// Start `track` right away, replacing whatever is playing.
    async fn play(&self, guild_id: GuildId, track: &Track, volume: Option<i32>) -> Result<(), Error>;

    async fn stop(&self, guild_id: GuildId) -> Result<(), Error>;

    async fn pause(&self, guild_id: GuildId, paused: bool) -> Result<(), Error>;

    async fn set_volume(&self, guild_id: GuildId, volume: i32) -> Result<(), Error>;

    async fn set_filters(&self, guild_id: GuildId, filters: &Filters) -> Result<(), Error>;

    /// Leave voice and destroy the node-side player.
    async fn disconnect(&self, guild_id: GuildId) -> Result<(), Error>;
}
