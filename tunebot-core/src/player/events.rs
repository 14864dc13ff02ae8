use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, warn};

use tunebot_common::models::{GuildId, PlaybackEvent};

use crate::player::registry::SessionRegistry;

/// Feeds node events to the registry one guild at a time. Each guild gets its
/// own worker, so a guild's events are handled in the order they arrived
/// while a slow guild never holds up the others.
pub struct PlaybackEventRouter {
    sessions: Arc<SessionRegistry>,
    lanes: HashMap<GuildId, UnboundedSender<PlaybackEvent>>,
}

impl PlaybackEventRouter {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions, lanes: HashMap::new() }
    }

    pub fn dispatch(&mut self, event: PlaybackEvent) {
        let guild_id = event.guild_id();
        let event = match self.lanes.get(&guild_id) {
            Some(lane) => match lane.send(event) {
                Ok(()) => return,
                Err(returned) => returned.0,
            },
            None => event,
        };

        let lane = self.spawn_lane(guild_id);
        if lane.send(event).is_err() {
            warn!("Dropping playback event for guild {guild_id}: worker is gone");
        }
        self.lanes.insert(guild_id, lane);
    }

    fn spawn_lane(&self, guild_id: GuildId) -> UnboundedSender<PlaybackEvent> {
        debug!("Starting playback event worker for guild {guild_id}");
        let (tx, mut rx) = unbounded_channel::<PlaybackEvent>();
        let sessions = Arc::clone(&self.sessions);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sessions.handle_event(event).await {
                    warn!("Handling playback event for guild {guild_id} failed: {e}");
                }
            }
        });
        tx
    }
}
