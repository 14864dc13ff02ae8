use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tunebot_core::config::{BotConfig, LavalinkConfig, PlaybackSettings};
use tunebot_core::platforms::discord::ChatCommandEvent;
use tunebot_core::player::PlaybackEventRouter;
use tunebot_core::services::{CommandInvocation, CommandService, MessageSender};

mod context;
use context::BotContext;

#[derive(Parser, Debug, Clone)]
#[command(name = "tunebot")]
#[command(author, version, about = "TuneBot - Discord music bot backed by Lavalink")]
struct Args {
    /// Discord bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    discord_token: String,

    /// Lavalink REST base URI.
    #[arg(long, env = "LAVALINK_URI", default_value = "http://localhost:2333")]
    lavalink_uri: String,

    #[arg(long, env = "LAVALINK_PASSWORD", default_value = "youshallnotpass", hide_env_values = true)]
    lavalink_password: String,

    /// SQLite URL of the favorites database.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://favorites.db")]
    database_url: String,

    #[arg(long, env = "COMMAND_PREFIX", default_value = "!")]
    command_prefix: String,

    /// Volume a session starts at, in percent.
    #[arg(long, env = "DEFAULT_VOLUME", default_value_t = 30)]
    default_volume: i32,

    /// Lavalink source used for plain-text queries.
    #[arg(long, env = "SEARCH_PREFIX", default_value = "ytsearch")]
    search_prefix: String,

    #[arg(long, env = "VOICE_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    voice_connect_timeout_secs: u64,
}

impl Args {
    fn into_config(self) -> BotConfig {
        BotConfig {
            discord_token: self.discord_token,
            command_prefix: self.command_prefix,
            database_url: self.database_url,
            voice_connect_timeout: Duration::from_secs(self.voice_connect_timeout_secs),
            lavalink: LavalinkConfig {
                uri: self.lavalink_uri,
                password: self.lavalink_password,
                client_name: format!("tunebot/{}", env!("CARGO_PKG_VERSION")),
            },
            playback: PlaybackSettings {
                default_volume: self.default_volume,
                search_prefix: self.search_prefix,
            },
        }
    }
}

fn init_tracing() {
    // Route `log` records from dependencies into tracing.
    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::from_default_env()
        .add_directive("tunebot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!(
        "TuneBot starting. lavalink={}, database={}, prefix='{}'",
        args.lavalink_uri, args.database_url, args.command_prefix
    );

    if let Err(e) = run(args.into_config()).await {
        error!("TuneBot stopped with an error: {:?}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    let BotContext {
        mut runtime,
        sessions,
        commands,
        sender,
        mut chat_rx,
        mut playback_rx,
        lavalink_task,
    } = BotContext::new(config).await?;
    info!("TuneBot is up. Press Ctrl-C to stop.");
    let mut playback_events = PlaybackEventRouter::new(sessions);

    loop {
        tokio::select! {
            Some(event) = chat_rx.recv() => {
                tokio::spawn(handle_chat_event(commands.clone(), sender.clone(), event));
            }
            Some(event) = playback_rx.recv() => playback_events.dispatch(event),
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    error!("Ctrl-C handler error: {:?}", e);
                }
                info!("Ctrl-C received, shutting down.");
                break;
            }
            else => {
                warn!("All event sources closed.");
                break;
            }
        }
    }

    runtime.shutdown().await;
    lavalink_task.abort();
    info!("TuneBot shutdown complete. Goodbye!");
    Ok(())
}

async fn handle_chat_event(commands: Arc<CommandService>, sender: Arc<MessageSender>, event: ChatCommandEvent) {
    let invocation = CommandInvocation {
        guild_id: event.guild_id,
        channel_id: event.channel_id,
        user_id: event.user_id,
        user_voice_channel: event.user_voice_channel,
    };
    let Some(reply) = commands.handle_chat_line(invocation, &event.content).await else {
        return;
    };
    debug!("{} ran '{}' in guild {}", event.username, event.content, event.guild_id);
    sender.deliver_logged(event.channel_id, event.message_id, reply).await;
}
