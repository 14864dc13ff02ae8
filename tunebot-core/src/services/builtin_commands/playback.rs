use async_trait::async_trait;
use tracing::info;

use crate::player::{EnqueueOutcome, QueueMode};
use crate::services::command_service::{CommandContext, CommandHandler, Reply, CHECK_MARK};
use crate::{CommandError, Error};

pub struct PlayCommand;

#[async_trait]
impl CommandHandler for PlayCommand {
    fn description(&self) -> &'static str {
        "Play a song or add it to the queue (search text or URL)"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, args: &str) -> Result<Reply, Error> {
        if args.is_empty() {
            return Ok(Reply::text(format!("Usage: `{}play <song name or URL>`", ctx.prefix)));
        }
        let outcome = ctx
            .sessions
            .enqueue_or_play(ctx.guild_id, ctx.user_voice_channel, args)
            .await?;
        Ok(match outcome {
            EnqueueOutcome::Started(track) => {
                info!("Guild {} => now playing '{}'", ctx.guild_id, track.title());
                Reply::text(format!("▶️ Now playing {}.", track.display_line()))
            }
            EnqueueOutcome::Queued(track) => Reply::text(format!("🎵 Added **{}** to the queue.", track.title())),
        })
    }
}

pub struct SkipCommand;

#[async_trait]
impl CommandHandler for SkipCommand {
    fn description(&self) -> &'static str {
        "Skip the current song"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let skipped = ctx.sessions.skip(ctx.guild_id).await?;
        Ok(Reply::text(format!("⏭️ Skipped **{}**.", skipped.title())))
    }
}

pub struct DisconnectCommand;

#[async_trait]
impl CommandHandler for DisconnectCommand {
    fn description(&self) -> &'static str {
        "Leave the voice channel"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        if ctx.sessions.disconnect(ctx.guild_id).await? {
            Ok(Reply::React(CHECK_MARK))
        } else {
            Ok(Reply::Silent)
        }
    }
}

pub struct VolumeCommand;

#[async_trait]
impl CommandHandler for VolumeCommand {
    fn description(&self) -> &'static str {
        "Set the playback volume in percent"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, args: &str) -> Result<Reply, Error> {
        let Ok(value) = args.parse::<i32>() else {
            return Ok(Reply::text(format!("Usage: `{}volume <number>`", ctx.prefix)));
        };
        ctx.sessions.set_volume(ctx.guild_id, value).await?;
        Ok(Reply::text(format!("🔊 Volume set to {value}%.")))
    }
}

pub struct PauseCommand;

#[async_trait]
impl CommandHandler for PauseCommand {
    fn description(&self) -> &'static str {
        "Pause the current song"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let title = ctx.sessions.set_paused(ctx.guild_id, true).await?;
        Ok(Reply::text(format!("⏸️ Paused **{title}**.")))
    }
}

pub struct ResumeCommand;

#[async_trait]
impl CommandHandler for ResumeCommand {
    fn description(&self) -> &'static str {
        "Resume a paused song"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let title = ctx.sessions.set_paused(ctx.guild_id, false).await?;
        Ok(Reply::text(format!("▶️ Resumed **{title}**.")))
    }
}

pub struct NowPlayingCommand;

#[async_trait]
impl CommandHandler for NowPlayingCommand {
    fn description(&self) -> &'static str {
        "Show the song that is playing"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let np = ctx
            .sessions
            .now_playing(ctx.guild_id)
            .await
            .ok_or(CommandError::NothingPlaying)?;

        let mut text = format!("🎧 Now playing {}", np.track.display_line());
        if np.paused {
            text.push_str(" (paused)");
        }
        if np.mode == QueueMode::LoopOne {
            text.push_str(" 🔂");
        }
        if np.queued > 0 {
            text.push_str(&format!("\n{} more in the queue.", np.queued));
        }
        Ok(Reply::Text(text))
    }
}
