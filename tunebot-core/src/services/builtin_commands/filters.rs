use async_trait::async_trait;

use tunebot_common::models::FilterPreset;

use crate::services::command_service::{CommandContext, CommandHandler, Reply, CHECK_MARK};
use crate::Error;

/// One handler per preset; `nightcore` and `slowed` only differ in the preset.
pub struct FilterCommand {
    pub preset: FilterPreset,
}

#[async_trait]
impl CommandHandler for FilterCommand {
    fn description(&self) -> &'static str {
        match self.preset {
            FilterPreset::Nightcore => "Apply the nightcore filter",
            FilterPreset::Slowed => "Apply the slowed filter",
        }
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        Ok(if ctx.sessions.apply_filter(ctx.guild_id, self.preset).await? {
            Reply::React(CHECK_MARK)
        } else {
            Reply::Silent
        })
    }
}
