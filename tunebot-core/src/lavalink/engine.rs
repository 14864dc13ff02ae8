use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use tunebot_common::models::{ChannelId, Filters, GuildId, Track};
use tunebot_common::traits::AudioEngine;

use crate::lavalink::client::LavalinkClient;
use crate::lavalink::models::{LoadResult, UpdatePlayer, UpdatePlayerTrack};
use crate::platforms::VoiceConnector;
use crate::Error;

/// [`AudioEngine`] backed by a Lavalink node plus the chat gateway's voice
/// signalling.
pub struct LavalinkEngine {
    client: Arc<LavalinkClient>,
    voice: Arc<dyn VoiceConnector>,
}

impl LavalinkEngine {
    pub fn new(client: Arc<LavalinkClient>, voice: Arc<dyn VoiceConnector>) -> Self {
        Self { client, voice }
    }
}

#[async_trait]
impl AudioEngine for LavalinkEngine {
    async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, Error> {
        let result = self.client.load_tracks(identifier).await?;
        if let LoadResult::Error(e) = &result {
            warn!("Lavalink could not load '{identifier}': {:?} ({})", e.message, e.severity);
        }
        Ok(result.into_tracks())
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), Error> {
        self.voice.join(guild_id, channel_id).await
    }

    async fn play(&self, guild_id: GuildId, track: &Track, volume: Option<i32>) -> Result<(), Error> {
        let update = UpdatePlayer {
            track: Some(UpdatePlayerTrack { encoded: Some(track.encoded.clone()) }),
            volume,
            paused: Some(false),
            ..Default::default()
        };
        self.client.update_player(guild_id, &update).await
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), Error> {
        let update = UpdatePlayer {
            track: Some(UpdatePlayerTrack { encoded: None }),
            ..Default::default()
        };
        self.client.update_player(guild_id, &update).await
    }

    async fn pause(&self, guild_id: GuildId, paused: bool) -> Result<(), Error> {
        let update = UpdatePlayer { paused: Some(paused), ..Default::default() };
        self.client.update_player(guild_id, &update).await
    }

    async fn set_volume(&self, guild_id: GuildId, volume: i32) -> Result<(), Error> {
        let update = UpdatePlayer { volume: Some(volume), ..Default::default() };
        self.client.update_player(guild_id, &update).await
    }

    async fn set_filters(&self, guild_id: GuildId, filters: &Filters) -> Result<(), Error> {
        let update = UpdatePlayer { filters: Some(filters.clone()), ..Default::default() };
        self.client.update_player(guild_id, &update).await
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), Error> {
        let left = self.voice.leave(guild_id).await;
        self.client.destroy_player(guild_id).await?;
        left
    }
}
