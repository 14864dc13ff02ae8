use crate::models::ids::GuildId;

/// Something the audio node reported about a guild's player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// The playing track stopped. `may_start_next` is true when it ran out on
    /// its own (finished, or failed to load) rather than being stopped or
    /// replaced by us. `encoded` names the track that ended, so a report that
    /// arrives after the player already moved on can be told apart.
    TrackEnded {
        guild_id: GuildId,
        encoded: String,
        may_start_next: bool,
    },
    TrackFailed {
        guild_id: GuildId,
        message: String,
    },
    /// The voice connection for the guild is gone.
    VoiceClosed {
        guild_id: GuildId,
        code: u16,
        reason: String,
    },
}

impl PlaybackEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            PlaybackEvent::TrackEnded { guild_id, .. }
            | PlaybackEvent::TrackFailed { guild_id, .. }
            | PlaybackEvent::VoiceClosed { guild_id, .. } => *guild_id,
        }
    }
}
