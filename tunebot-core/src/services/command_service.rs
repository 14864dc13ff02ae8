use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use tunebot_common::models::{ChannelId, GuildId, UserId};
use tunebot_common::traits::FavoritesRepository;

use crate::player::SessionRegistry;
use crate::services::builtin_commands::builtin_handlers;
use crate::Error;

/// Context passed to command handlers.
pub struct CommandContext<'a> {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// Voice channel the invoking user is sitting in, if any.
    pub user_voice_channel: Option<ChannelId>,
    pub prefix: &'a str,
    pub sessions: &'a SessionRegistry,
    pub favorites: &'a Arc<dyn FavoritesRepository>,
}

/// Who ran a command and where.
#[derive(Debug, Clone, Copy)]
pub struct CommandInvocation {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub user_voice_channel: Option<ChannelId>,
}

/// What the bot answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// React to the command message instead of posting.
    React(&'static str),
    Silent,
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }
}

pub const CHECK_MARK: &str = "✅";
const GENERIC_FAILURE: &str = "⚠️ Something went wrong while running that command.";

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// One line for `help`.
    fn description(&self) -> &'static str;

    async fn handle(&self, ctx: &CommandContext<'_>, args: &str) -> Result<Reply, Error>;
}

/// Parses prefixed chat lines and routes them through the dispatch table.
pub struct CommandService {
    sessions: Arc<SessionRegistry>,
    favorites: Arc<dyn FavoritesRepository>,
    prefix: String,
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
    /// Primary names in registration order, for `help`.
    names: Vec<&'static str>,
}

impl CommandService {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        favorites: Arc<dyn FavoritesRepository>,
        prefix: impl Into<String>,
    ) -> Self {
        debug!("Initializing CommandService");
        let mut svc = Self {
            sessions,
            favorites,
            prefix: prefix.into(),
            handlers: HashMap::new(),
            names: Vec::new(),
        };
        for (names, handler) in builtin_handlers() {
            svc.register(names, handler);
        }
        debug!("CommandService => {} commands registered", svc.names.len());
        svc
    }

    /// Add a handler under one or more names; the first one is shown in `help`.
    pub fn register(&mut self, names: &[&'static str], handler: Arc<dyn CommandHandler>) {
        if let Some(&primary) = names.first() {
            self.names.push(primary);
        }
        for &name in names {
            self.handlers.insert(name, handler.clone());
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Split `!name rest of line` into a lowercased name and the raw argument
    /// string. `None` when the line is not a command.
    pub fn parse<'m>(&self, message_text: &'m str) -> Option<(String, &'m str)> {
        let rest = message_text.trim().strip_prefix(self.prefix.as_str())?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().filter(|n| !n.is_empty())?;
        let args = parts.next().unwrap_or("").trim();
        Some((name.to_lowercase(), args))
    }

    /// Processes a chat message and returns the reply if it was a known command.
    pub async fn handle_chat_line(&self, invocation: CommandInvocation, message_text: &str) -> Option<Reply> {
        let (name, args) = self.parse(message_text)?;

        if name == "help" {
            return Some(self.help());
        }

        let Some(handler) = self.handlers.get(name.as_str()) else {
            debug!("No command found matching '{}'", name);
            return None;
        };

        let ctx = CommandContext {
            guild_id: invocation.guild_id,
            channel_id: invocation.channel_id,
            user_id: invocation.user_id,
            user_voice_channel: invocation.user_voice_channel,
            prefix: &self.prefix,
            sessions: &self.sessions,
            favorites: &self.favorites,
        };

        let reply = match handler.handle(&ctx, args).await {
            Ok(reply) => reply,
            Err(Error::Command(e)) => {
                debug!("Command '{}' in guild {} => {:?}", name, invocation.guild_id, e);
                Reply::Text(e.to_string())
            }
            Err(e) => {
                error!("Command '{}' in guild {} failed: {:?}", name, invocation.guild_id, e);
                Reply::text(GENERIC_FAILURE)
            }
        };
        Some(reply)
    }

    fn help(&self) -> Reply {
        let lines: Vec<String> = self
            .names
            .iter()
            .filter_map(|name| {
                self.handlers
                    .get(name)
                    .map(|h| format!("`{}{}` - {}", self.prefix, name, h.description()))
            })
            .collect();
        Reply::Text(format!("🎛️ **Commands:**\n{}", lines.join("\n")))
    }
}
