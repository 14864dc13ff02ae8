use async_trait::async_trait;

use crate::player::QueueMode;
use crate::services::command_service::{CommandContext, CommandHandler, Reply};
use crate::Error;

pub struct QueueCommand;

#[async_trait]
impl CommandHandler for QueueCommand {
    fn description(&self) -> &'static str {
        "Show the upcoming songs"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let tracks = ctx.sessions.list_queue(ctx.guild_id).await;
        if tracks.is_empty() {
            return Ok(Reply::text("🎶 The queue is empty."));
        }
        let lines: Vec<String> = tracks.iter().map(|t| t.display_line()).collect();
        Ok(Reply::text(format!("📜 **Queue:**\n{}", lines.join("\n"))))
    }
}

pub struct LoopCommand;

#[async_trait]
impl CommandHandler for LoopCommand {
    fn description(&self) -> &'static str {
        "Toggle repeating the current song"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let Some(toggle) = ctx.sessions.toggle_loop(ctx.guild_id).await else {
            return Ok(Reply::Silent);
        };
        let text = match (toggle.mode, toggle.current_title) {
            (QueueMode::LoopOne, Some(title)) => format!("🔄 Looping **{title}**."),
            (QueueMode::LoopOne, None) => "🔄 Looping enabled.".to_string(),
            (QueueMode::Normal, Some(title)) => format!("❌ Stopped looping **{title}**."),
            (QueueMode::Normal, None) => "❌ Looping disabled.".to_string(),
        };
        Ok(Reply::Text(text))
    }
}

pub struct AutoplayCommand;

#[async_trait]
impl CommandHandler for AutoplayCommand {
    fn description(&self) -> &'static str {
        "Toggle playing the next queued song when one ends"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        Ok(match ctx.sessions.toggle_autoplay(ctx.guild_id).await {
            Some(true) => Reply::text("▶️ Autoplay enabled."),
            Some(false) => Reply::text("⏹️ Autoplay disabled. Use skip to move on."),
            None => Reply::Silent,
        })
    }
}

pub struct ShuffleCommand;

#[async_trait]
impl CommandHandler for ShuffleCommand {
    fn description(&self) -> &'static str {
        "Shuffle the queue"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        Ok(if ctx.sessions.shuffle(ctx.guild_id).await {
            Reply::text("🔀 Queue shuffled.")
        } else {
            Reply::Silent
        })
    }
}

pub struct ClearCommand;

#[async_trait]
impl CommandHandler for ClearCommand {
    fn description(&self) -> &'static str {
        "Remove every song from the queue"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        Ok(if ctx.sessions.clear(ctx.guild_id).await {
            Reply::text("🗑️ Cleared the queue.")
        } else {
            Reply::Silent
        })
    }
}
