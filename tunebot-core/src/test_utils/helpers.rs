// File: tunebot-core/src/test_utils/helpers.rs
//! Doubles for exercising sessions and commands without a node or a gateway.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use twilight_model::id::Id;

use tunebot_common::models::{ChannelId, FavoriteEntry, Filters, GuildId, Track, TrackInfo, UserId};
use tunebot_common::traits::{AudioEngine, FavoritesRepository};

use crate::Error;

/// A track whose title, author and url are all derived from `title`.
pub fn track(title: &str) -> Track {
    Track {
        encoded: format!("encoded:{title}"),
        info: TrackInfo {
            identifier: title.to_string(),
            is_seekable: true,
            author: format!("{title} artist"),
            length: 180_000,
            is_stream: false,
            position: 0,
            title: title.to_string(),
            uri: Some(format!("https://example.com/watch?v={title}")),
            artwork_url: None,
            isrc: None,
            source_name: "youtube".to_string(),
        },
    }
}

pub fn guild(id: u64) -> GuildId {
    Id::new(id)
}

pub fn channel(id: u64) -> ChannelId {
    Id::new(id)
}

pub fn user(id: u64) -> UserId {
    Id::new(id)
}

/// One call made against [`FakeEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(String),
    Connect(GuildId, ChannelId),
    Play(GuildId, String, Option<i32>),
    Stop(GuildId),
    Pause(GuildId, bool),
    Volume(GuildId, i32),
    Filters(GuildId, Filters),
    Disconnect(GuildId),
}

/// In-memory engine. Every search `ytsearch:<x>` resolves to `track(x)`
/// unless `x` was registered as having no results.
#[derive(Default)]
pub struct FakeEngine {
    calls: Mutex<Vec<EngineCall>>,
    no_results: Mutex<Vec<String>>,
    overrides: Mutex<HashMap<String, Vec<Track>>>,
    fail_connect: Mutex<bool>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn set_no_results(&self, identifier: &str) {
        self.no_results.lock().push(identifier.to_string());
    }

    pub fn set_results(&self, identifier: &str, tracks: Vec<Track>) {
        self.overrides.lock().insert(identifier.to_string(), tracks);
    }

    pub fn fail_connect(&self, fail: bool) {
        *self.fail_connect.lock() = fail;
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AudioEngine for FakeEngine {
    async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, Error> {
        self.record(EngineCall::Load(identifier.to_string()));
        if self.no_results.lock().iter().any(|i| i == identifier) {
            return Ok(Vec::new());
        }
        if let Some(tracks) = self.overrides.lock().get(identifier) {
            return Ok(tracks.clone());
        }
        let name = identifier.split_once(':').map(|(_, q)| q).unwrap_or(identifier);
        Ok(vec![track(name)])
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), Error> {
        self.record(EngineCall::Connect(guild_id, channel_id));
        if *self.fail_connect.lock() {
            return Err(Error::Platform("voice connect refused".to_string()));
        }
        Ok(())
    }

    async fn play(&self, guild_id: GuildId, track: &Track, volume: Option<i32>) -> Result<(), Error> {
        self.record(EngineCall::Play(guild_id, track.info.title.clone(), volume));
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<(), Error> {
        self.record(EngineCall::Stop(guild_id));
        Ok(())
    }

    async fn pause(&self, guild_id: GuildId, paused: bool) -> Result<(), Error> {
        self.record(EngineCall::Pause(guild_id, paused));
        Ok(())
    }

    async fn set_volume(&self, guild_id: GuildId, volume: i32) -> Result<(), Error> {
        self.record(EngineCall::Volume(guild_id, volume));
        Ok(())
    }

    async fn set_filters(&self, guild_id: GuildId, filters: &Filters) -> Result<(), Error> {
        self.record(EngineCall::Filters(guild_id, filters.clone()));
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), Error> {
        self.record(EngineCall::Disconnect(guild_id));
        Ok(())
    }
}

/// Favorites kept in a vector; can be switched to fail every write.
#[derive(Default)]
pub struct MemoryFavorites {
    rows: Mutex<Vec<FavoriteEntry>>,
    fail_writes: Mutex<bool>,
}

impl MemoryFavorites {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn rows(&self) -> Vec<FavoriteEntry> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl FavoritesRepository for MemoryFavorites {
    async fn add_favorite(&self, entry: &FavoriteEntry) -> Result<(), Error> {
        if *self.fail_writes.lock() {
            return Err(Error::Platform("favorites store unavailable".to_string()));
        }
        self.rows.lock().push(entry.clone());
        Ok(())
    }

    async fn list_favorites(&self, user_id: UserId) -> Result<Vec<FavoriteEntry>, Error> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
