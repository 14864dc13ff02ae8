pub mod runtime;
pub mod voice;

pub use runtime::{ChatCommandEvent, DiscordGateway, DiscordRuntime};
pub use voice::{ShardSenders, VoiceBridge, VoiceDispatch};
