use tunebot_common::models::{ChannelId, Filters, GuildId, Track};

use crate::player::queue::Queue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Voice join in flight; no operation may use the session yet.
    Connecting,
    Idle,
    Playing,
    Paused,
    /// Torn down; a handle still held by a late caller must not be used.
    Disconnected,
}

/// Playback state for the one voice connection the bot holds in a guild.
#[derive(Debug, Clone)]
pub struct Session {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub state: SessionState,
    pub current: Option<Track>,
    pub queue: Queue,
    /// Unset until the first track starts. Every start from idle resets it
    /// to the configured default.
    pub volume: Option<i32>,
    /// Move on to the next queued track when one finishes.
    pub autoplay: bool,
    pub filters: Filters,
}

impl Session {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
            state: SessionState::Connecting,
            current: None,
            queue: Queue::new(),
            volume: None,
            autoplay: true,
            filters: Filters::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::Connecting | SessionState::Disconnected)
    }

    /// A track is loaded on the player, paused or not.
    pub fn is_playing(&self) -> bool {
        self.current.is_some() && matches!(self.state, SessionState::Playing | SessionState::Paused)
    }

    pub(crate) fn start(&mut self, track: Track) {
        self.current = Some(track);
        self.state = SessionState::Playing;
    }

    pub(crate) fn go_idle(&mut self) {
        self.current = None;
        self.state = SessionState::Idle;
    }
}
