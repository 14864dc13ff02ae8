use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway,
    CloseFrame,
    Config,
    Event,
    EventTypeFlags,
    Intents,
    MessageSender,
    Shard,
    StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_http::Client as HttpClient;

use tunebot_common::models::{ChannelId, GuildId, MessageId, PlaybackEvent, UserId};
use tunebot_common::traits::ChatGateway;

use crate::platforms::discord::voice::{VoiceBridge, VoiceDispatch};
use crate::Error;

/// A guild message that may be a command, with the author's voice channel
/// already looked up from the cache.
#[derive(Debug, Clone)]
pub struct ChatCommandEvent {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub username: String,
    pub user_voice_channel: Option<ChannelId>,
    pub content: String,
}

/// The shard runner:
///   - calls `shard.next_event(...)`
///   - updates the in-memory cache
///   - sends inbound guild messages to `tx`
///   - hands voice dispatches to the voice bridge, one at a time
async fn shard_runner(
    mut shard: Shard,
    tx: UnboundedSender<ChatCommandEvent>,
    playback_tx: UnboundedSender<PlaybackEvent>,
    voice: Arc<VoiceBridge>,
    cache: Arc<InMemoryCache>,
) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };
        cache.update(&event);

        match event {
            Event::Ready(ready) => {
                info!("Shard {shard_id} => READY as {} (ID={})", ready.user.name, ready.user.id);
            }
            Event::MessageCreate(msg) => {
                if msg.author.bot {
                    trace!("Ignoring bot message from {}", msg.author.name);
                    continue;
                }
                let Some(guild_id) = msg.guild_id else {
                    trace!("Ignoring direct message from {}", msg.author.name);
                    continue;
                };
                let user_voice_channel = cache
                    .voice_state(msg.author.id, guild_id)
                    .map(|state| state.channel_id());

                let _ = tx.send(ChatCommandEvent {
                    guild_id,
                    channel_id: msg.channel_id,
                    message_id: msg.id,
                    user_id: msg.author.id,
                    username: msg.author.name.clone(),
                    user_voice_channel,
                    content: msg.content.clone(),
                });
            }
            Event::VoiceStateUpdate(update) => {
                let state = update.0;
                let Some(guild_id) = state.guild_id else {
                    continue;
                };
                let dispatch = VoiceDispatch::State {
                    guild_id,
                    user_id: state.user_id,
                    channel_id: state.channel_id,
                    session_id: state.session_id,
                };
                voice.dispatch(dispatch, &playback_tx).await;
            }
            Event::VoiceServerUpdate(update) => {
                let dispatch = VoiceDispatch::Server {
                    guild_id: update.guild_id,
                    token: update.token,
                    endpoint: update.endpoint,
                };
                voice.dispatch(dispatch, &playback_tx).await;
            }
            other => {
                trace!("Shard {shard_id} => unhandled event: {:?}", other.kind());
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

/// Owns the gateway shards, the REST client and the cache.
pub struct DiscordRuntime {
    pub http: Arc<HttpClient>,
    pub cache: Arc<InMemoryCache>,
    shards: Vec<Shard>,
    shard_senders: Vec<MessageSender>,
    shard_tasks: Vec<JoinHandle<()>>,
}

impl DiscordRuntime {
    /// Build the REST client and cache and create the recommended shards.
    /// Nothing is read from the gateway until [`DiscordRuntime::start`].
    pub async fn new(token: String) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let http = Arc::new(
            ClientBuilder::new()
                .token(token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );

        let cache = Arc::new(
            InMemoryCache::builder()
                .resource_types(ResourceType::GUILD | ResourceType::CHANNEL | ResourceType::VOICE_STATE)
                .build(),
        );

        let config = Config::new(
            token,
            Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT | Intents::GUILD_VOICE_STATES,
        );
        let shards: Vec<Shard> = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?
            .collect();
        let shard_senders = shards.iter().map(|s| s.sender()).collect();
        info!("(DiscordRuntime) Created {} shard(s)", shards.len());

        Ok(Self {
            http,
            cache,
            shards,
            shard_senders,
            shard_tasks: Vec::new(),
        })
    }

    pub fn shard_senders(&self) -> Vec<MessageSender> {
        self.shard_senders.clone()
    }

    pub async fn bot_user_id(&self) -> Result<UserId, Error> {
        let user = self
            .http
            .current_user()
            .await
            .map_err(|e| Error::Platform(format!("Error fetching current user: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding current user: {e}")))?;
        Ok(user.id)
    }

    pub fn gateway(&self) -> Arc<DiscordGateway> {
        Arc::new(DiscordGateway { http: self.http.clone() })
    }

    /// Spawn a runner per shard and return the stream of guild messages.
    pub fn start(
        &mut self,
        voice: Arc<VoiceBridge>,
        playback_tx: UnboundedSender<PlaybackEvent>,
    ) -> UnboundedReceiver<ChatCommandEvent> {
        let (tx, rx) = unbounded_channel::<ChatCommandEvent>();

        for shard in self.shards.drain(..) {
            let handle = tokio::spawn(shard_runner(
                shard,
                tx.clone(),
                playback_tx.clone(),
                voice.clone(),
                self.cache.clone(),
            ));
            self.shard_tasks.push(handle);
        }
        rx
    }

    /// Close every shard and wait for the runners to finish.
    pub async fn shutdown(&mut self) {
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in self.shard_tasks.drain(..) {
            let _ = task.await;
        }
        debug!("(DiscordRuntime) All shards closed");
    }
}

/// Outgoing messages and reactions over Discord's REST API.
pub struct DiscordGateway {
    http: Arc<HttpClient>,
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> Result<(), Error> {
        self.http
            .create_message(channel_id)
            .content(content)
            .await
            .map_err(|e| Error::Platform(format!("Error sending Discord message: {e:?}")))?;
        Ok(())
    }

    async fn react(&self, channel_id: ChannelId, message_id: MessageId, emoji: &str) -> Result<(), Error> {
        self.http
            .create_reaction(channel_id, message_id, &RequestReactionType::Unicode { name: emoji })
            .await
            .map_err(|e| Error::Platform(format!("Error adding Discord reaction: {e:?}")))?;
        Ok(())
    }
}
