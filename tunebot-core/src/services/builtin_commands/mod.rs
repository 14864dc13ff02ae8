//! Commands the bot ships with. Each one is a small handler struct; the
//! dispatcher looks them up by name.

use std::sync::Arc;

use tunebot_common::models::FilterPreset;

use crate::services::command_service::CommandHandler;

pub mod favorites;
pub mod filters;
pub mod playback;
pub mod queue;

use favorites::{FavoriteCommand, FavoritesCommand};
use filters::FilterCommand;
use playback::{
    DisconnectCommand, NowPlayingCommand, PauseCommand, PlayCommand, ResumeCommand, SkipCommand, VolumeCommand,
};
use queue::{AutoplayCommand, ClearCommand, LoopCommand, QueueCommand, ShuffleCommand};

pub type Entry = (&'static [&'static str], Arc<dyn CommandHandler>);

fn entry(names: &'static [&'static str], handler: impl CommandHandler + 'static) -> Entry {
    (names, Arc::new(handler))
}

/// Names (first one is primary) and handler for every built-in command, in
/// the order `help` lists them.
pub fn builtin_handlers() -> Vec<Entry> {
    vec![
        entry(&["play"], PlayCommand),
        entry(&["queue"], QueueCommand),
        entry(&["skip"], SkipCommand),
        entry(&["nowplaying", "np"], NowPlayingCommand),
        entry(&["pause"], PauseCommand),
        entry(&["resume"], ResumeCommand),
        entry(&["disconnect"], DisconnectCommand),
        entry(&["favorite"], FavoriteCommand),
        entry(&["favorites"], FavoritesCommand),
        entry(&["nightcore"], FilterCommand { preset: FilterPreset::Nightcore }),
        entry(&["slowed"], FilterCommand { preset: FilterPreset::Slowed }),
        entry(&["loop"], LoopCommand),
        entry(&["autoplay"], AutoplayCommand),
        entry(&["volume"], VolumeCommand),
        entry(&["shuffle"], ShuffleCommand),
        entry(&["clear"], ClearCommand),
    ]
}
