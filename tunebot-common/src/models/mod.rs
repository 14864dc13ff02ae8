// File: tunebot-common/src/models/mod.rs
pub mod ids;
pub mod track;
pub mod favorite;
pub mod filters;
pub mod playback;

pub use ids::{ChannelId, GuildId, MessageId, UserId};
pub use track::{Track, TrackInfo};
pub use favorite::FavoriteEntry;
pub use filters::{FilterPreset, Filters, Timescale};
pub use playback::PlaybackEvent;
