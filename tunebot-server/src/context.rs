//! tunebot-server/src/context.rs
//!
//! Builds every long-lived piece of the bot and wires them together.

use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::info;

use tunebot_common::models::PlaybackEvent;
use tunebot_common::traits::FavoritesRepository;
use tunebot_core::config::BotConfig;
use tunebot_core::lavalink::{LavalinkClient, LavalinkEngine};
use tunebot_core::platforms::discord::{ChatCommandEvent, DiscordRuntime, ShardSenders, VoiceBridge};
use tunebot_core::player::SessionRegistry;
use tunebot_core::repositories::SqliteFavoritesRepository;
use tunebot_core::services::{CommandService, MessageSender};
use tunebot_core::{Database, Error};

/// Everything the main loop needs, plus the handles to shut it down.
pub struct BotContext {
    pub runtime: DiscordRuntime,
    pub sessions: Arc<SessionRegistry>,
    pub commands: Arc<CommandService>,
    pub sender: Arc<MessageSender>,
    pub chat_rx: UnboundedReceiver<ChatCommandEvent>,
    pub playback_rx: UnboundedReceiver<PlaybackEvent>,
    pub lavalink_task: JoinHandle<()>,
}

impl BotContext {
    pub async fn new(config: BotConfig) -> Result<Self, Error> {
        // 1) Favorites store
        let db = Database::new(&config.database_url).await?;
        db.migrate().await?;
        let favorites: Arc<dyn FavoritesRepository> = Arc::new(SqliteFavoritesRepository::new(db.pool().clone()));

        // 2) Discord REST + shards (not started yet)
        let mut runtime = DiscordRuntime::new(config.discord_token.clone()).await?;
        let bot_user_id = runtime.bot_user_id().await?;
        info!("Bot user id is {bot_user_id}");

        // 3) Audio node; its events and Discord's voice events share one channel
        let (playback_tx, playback_rx) = unbounded_channel::<PlaybackEvent>();
        let lavalink = Arc::new(LavalinkClient::new(config.lavalink.clone()));
        let lavalink_task = lavalink.connect(bot_user_id, playback_tx.clone()).await?;

        // 4) Voice signalling and the session layer on top of it
        let voice = Arc::new(VoiceBridge::new(
            bot_user_id,
            Arc::new(ShardSenders::new(runtime.shard_senders())),
            lavalink.clone(),
            config.voice_connect_timeout,
        ));
        let engine = Arc::new(LavalinkEngine::new(lavalink, voice.clone()));
        let sessions = Arc::new(SessionRegistry::new(engine, config.playback.clone()));

        // 5) Commands and replies
        let commands = Arc::new(CommandService::new(sessions.clone(), favorites, config.command_prefix.clone()));
        let sender = Arc::new(MessageSender::new(runtime.gateway()));

        // 6) Start reading from the gateway
        let chat_rx = runtime.start(voice, playback_tx);

        Ok(Self {
            runtime,
            sessions,
            commands,
            sender,
            chat_rx,
            playback_rx,
            lavalink_task,
        })
    }
}
