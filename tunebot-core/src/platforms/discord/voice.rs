//! Voice signalling between the Discord gateway and the audio node.
//!
//! Joining a voice channel means asking the gateway to move the bot, then
//! collecting two dispatches: the bot's own `VOICE_STATE_UPDATE` (session id)
//! and `VOICE_SERVER_UPDATE` (token and endpoint). Once both are in, the node
//! gets them and opens the actual voice connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use twilight_gateway::MessageSender;
use twilight_model::gateway::payload::outgoing::UpdateVoiceState;

use tunebot_common::models::{ChannelId, GuildId, PlaybackEvent, UserId};

use crate::lavalink::LavalinkClient;
use crate::lavalink::models::{UpdatePlayer, VoiceState};
use crate::platforms::VoiceConnector;
use crate::Error;

/// Sends voice state commands over the gateway.
pub trait VoiceCommandSender: Send + Sync {
    fn update_voice_state(&self, guild_id: GuildId, channel_id: Option<ChannelId>) -> Result<(), Error>;
}

/// Receives completed voice credentials for a guild.
#[async_trait]
pub trait VoiceServerSink: Send + Sync {
    async fn voice_ready(&self, guild_id: GuildId, voice: VoiceState) -> Result<(), Error>;
}

/// One gateway sender per shard, indexed by shard number.
pub struct ShardSenders {
    senders: Vec<MessageSender>,
}

impl ShardSenders {
    pub fn new(senders: Vec<MessageSender>) -> Self {
        Self { senders }
    }

    fn for_guild(&self, guild_id: GuildId) -> Option<&MessageSender> {
        if self.senders.is_empty() {
            return None;
        }
        let shard = (guild_id.get() >> 22) % self.senders.len() as u64;
        self.senders.get(shard as usize)
    }
}

impl VoiceCommandSender for ShardSenders {
    fn update_voice_state(&self, guild_id: GuildId, channel_id: Option<ChannelId>) -> Result<(), Error> {
        let sender = self
            .for_guild(guild_id)
            .ok_or_else(|| Error::Platform("no gateway shard available".to_string()))?;
        sender
            .command(&UpdateVoiceState::new(guild_id, channel_id, true, false))
            .map_err(|e| Error::Platform(format!("voice state update failed: {e}")))
    }
}

#[async_trait]
impl VoiceServerSink for LavalinkClient {
    async fn voice_ready(&self, guild_id: GuildId, voice: VoiceState) -> Result<(), Error> {
        let update = UpdatePlayer { voice: Some(voice), ..Default::default() };
        self.update_player(guild_id, &update).await
    }
}

#[derive(Debug, Default, Clone)]
struct PendingVoice {
    session_id: Option<String>,
    token: Option<String>,
    endpoint: Option<String>,
}

impl PendingVoice {
    fn complete(&self) -> Option<VoiceState> {
        Some(VoiceState {
            token: self.token.clone()?,
            endpoint: self.endpoint.clone()?,
            session_id: self.session_id.clone()?,
        })
    }
}

/// Discord's close code for "disconnected from voice".
const VOICE_DISCONNECTED: u16 = 4014;

/// A voice dispatch from the gateway, reduced to what the bridge reads.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceDispatch {
    State {
        guild_id: GuildId,
        user_id: UserId,
        channel_id: Option<ChannelId>,
        session_id: String,
    },
    Server {
        guild_id: GuildId,
        token: String,
        endpoint: Option<String>,
    },
}

pub struct VoiceBridge {
    bot_user_id: UserId,
    commands: Arc<dyn VoiceCommandSender>,
    sink: Arc<dyn VoiceServerSink>,
    pending: DashMap<GuildId, PendingVoice>,
    waiters: DashMap<GuildId, oneshot::Sender<Result<(), Error>>>,
    timeout: Duration,
}

impl VoiceBridge {
    pub fn new(
        bot_user_id: UserId,
        commands: Arc<dyn VoiceCommandSender>,
        sink: Arc<dyn VoiceServerSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            bot_user_id,
            commands,
            sink,
            pending: DashMap::new(),
            waiters: DashMap::new(),
            timeout,
        }
    }

    /// Apply one dispatch. The shard runner awaits this before reading the
    /// next event, so a guild's state and server updates land in order.
    pub async fn dispatch(&self, dispatch: VoiceDispatch, playback_tx: &UnboundedSender<PlaybackEvent>) {
        match dispatch {
            VoiceDispatch::State { guild_id, user_id, channel_id, session_id } => {
                if self.handle_voice_state(guild_id, user_id, channel_id, &session_id).await {
                    let _ = playback_tx.send(PlaybackEvent::VoiceClosed {
                        guild_id,
                        code: VOICE_DISCONNECTED,
                        reason: "bot left the voice channel".to_string(),
                    });
                }
            }
            VoiceDispatch::Server { guild_id, token, endpoint } => {
                self.handle_voice_server(guild_id, &token, endpoint.as_deref()).await;
            }
        }
    }

    /// Feed a `VOICE_STATE_UPDATE`. Returns `true` when it says the bot itself
    /// was removed from voice outside of a join we started.
    pub async fn handle_voice_state(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: Option<ChannelId>,
        session_id: &str,
    ) -> bool {
        if user_id != self.bot_user_id {
            return false;
        }

        let Some(channel_id) = channel_id else {
            self.pending.remove(&guild_id);
            if self.waiters.contains_key(&guild_id) {
                debug!("Ignoring stale voice leave in guild {guild_id} while joining");
                return false;
            }
            return true;
        };

        debug!("Bot voice state in guild {guild_id}: channel {channel_id}");
        self.pending.entry(guild_id).or_default().session_id = Some(session_id.to_string());
        self.try_complete(guild_id).await;
        false
    }

    /// Feed a `VOICE_SERVER_UPDATE`. A missing endpoint means the voice server
    /// is being reallocated and another update will follow.
    pub async fn handle_voice_server(&self, guild_id: GuildId, token: &str, endpoint: Option<&str>) {
        let Some(endpoint) = endpoint else {
            debug!("Voice server for guild {guild_id} is being reallocated");
            return;
        };
        {
            let mut pending = self.pending.entry(guild_id).or_default();
            pending.token = Some(token.to_string());
            pending.endpoint = Some(endpoint.to_string());
        }
        self.try_complete(guild_id).await;
    }

    async fn try_complete(&self, guild_id: GuildId) {
        let Some(voice) = self.pending.get(&guild_id).and_then(|p| p.complete()) else {
            return;
        };

        let result = self.sink.voice_ready(guild_id, voice).await;
        match self.waiters.remove(&guild_id) {
            Some((_, waiter)) => {
                let _ = waiter.send(result);
            }
            None => match result {
                Ok(()) => debug!("Refreshed voice server for guild {guild_id}"),
                Err(e) => warn!("Could not hand voice server to the node for guild {guild_id}: {e}"),
            },
        }
    }
}

#[async_trait]
impl VoiceConnector for VoiceBridge {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(guild_id, tx);

        if let Err(e) = self.commands.update_voice_state(guild_id, Some(channel_id)) {
            self.waiters.remove(&guild_id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => {
                if result.is_ok() {
                    info!("Joined voice channel {channel_id} in guild {guild_id}");
                }
                result
            }
            Ok(Err(_)) => Err(Error::Platform(format!("voice join for guild {guild_id} was superseded"))),
            Err(elapsed) => {
                self.waiters.remove(&guild_id);
                let _ = self.commands.update_voice_state(guild_id, None);
                warn!("Timed out joining voice in guild {guild_id}");
                Err(elapsed.into())
            }
        }
    }

    async fn leave(&self, guild_id: GuildId) -> Result<(), Error> {
        self.pending.remove(&guild_id);
        self.commands.update_voice_state(guild_id, None)
    }
}
