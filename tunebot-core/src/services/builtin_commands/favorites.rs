use async_trait::async_trait;
use tracing::{debug, error};

use tunebot_common::models::FavoriteEntry;

use crate::services::command_service::{CommandContext, CommandHandler, Reply};
use crate::{CommandError, Error};

pub struct FavoriteCommand;

#[async_trait]
impl CommandHandler for FavoriteCommand {
    fn description(&self) -> &'static str {
        "Save the current song to your favorites"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let track = ctx
            .sessions
            .current_track(ctx.guild_id)
            .await
            .ok_or(CommandError::NothingPlaying)?;

        let entry = FavoriteEntry::from_track(ctx.user_id, &track);
        if let Err(e) = ctx.favorites.add_favorite(&entry).await {
            error!("Saving favorite for user {} failed: {e:?}", ctx.user_id);
            return Ok(Reply::text(format!(
                "⚠️ Could not save **{}** to your favorites. Please try again later.",
                entry.song_title
            )));
        }
        debug!("User {} saved '{}'", ctx.user_id, entry.song_title);
        Ok(Reply::text(format!(
            "💾 Added **{}** by **{}** to your favorites.",
            entry.song_title, entry.song_author
        )))
    }
}

pub struct FavoritesCommand;

#[async_trait]
impl CommandHandler for FavoritesCommand {
    fn description(&self) -> &'static str {
        "List your saved songs"
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _args: &str) -> Result<Reply, Error> {
        let rows = ctx.favorites.list_favorites(ctx.user_id).await?;
        if rows.is_empty() {
            return Ok(Reply::text("❤️ You don't have any favorite songs yet."));
        }
        let lines: Vec<String> = rows.iter().map(FavoriteEntry::display_line).collect();
        Ok(Reply::text(format!("💾 **Your Favorites:**\n{}", lines.join("\n"))))
    }
}
