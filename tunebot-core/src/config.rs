//! Runtime settings handed to the services at startup.

use std::time::Duration;

/// Knobs for how playback starts and how queries are resolved.
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    /// Volume used when a session starts playing and nobody has set one yet.
    pub default_volume: i32,
    /// Source prefix for free-text queries, e.g. `ytsearch`.
    pub search_prefix: String,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 30,
            search_prefix: "ytsearch".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LavalinkConfig {
    /// Base REST URI, e.g. `http://localhost:2333`.
    pub uri: String,
    pub password: String,
    pub client_name: String,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub command_prefix: String,
    pub database_url: String,
    pub voice_connect_timeout: Duration,
    pub lavalink: LavalinkConfig,
    pub playback: PlaybackSettings,
}
