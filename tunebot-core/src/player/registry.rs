//! Registry of live sessions, one per guild.
//!
//! The chat platform allows one voice connection per guild, so the guild id is
//! the key and each [`Session`] remembers the voice channel it is bound to.
//! Every operation holds the session's mutex for its whole duration, engine
//! round-trips included, so at most one mutating command runs per session.
//! Sessions in different guilds never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use tunebot_common::models::{ChannelId, FilterPreset, GuildId, PlaybackEvent, Track};
use tunebot_common::traits::AudioEngine;

use crate::config::PlaybackSettings;
use crate::player::queue::QueueMode;
use crate::player::session::{Session, SessionState};
use crate::{CommandError, Error};

/// Voice close codes after which the node will not recover the connection.
const TERMINAL_VOICE_CLOSE_CODES: [u16; 3] = [4006, 4009, 4014];

#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    Started(Track),
    Queued(Track),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopToggle {
    pub mode: QueueMode,
    pub current_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub mode: QueueMode,
    pub paused: bool,
    /// Tracks waiting after this one.
    pub queued: usize,
}

pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<Mutex<Session>>>,
    engine: Arc<dyn AudioEngine>,
    settings: PlaybackSettings,
}

/// Turn user input into something the node can load: URLs go through as-is,
/// anything else becomes a search on the configured source.
pub fn resolve_identifier(query: &str, search_prefix: &str) -> String {
    let query = query.trim();
    let is_url = url::Url::parse(query)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if is_url {
        query.to_string()
    } else {
        format!("{search_prefix}:{query}")
    }
}

impl SessionRegistry {
    pub fn new(engine: Arc<dyn AudioEngine>, settings: PlaybackSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            engine,
            settings,
        }
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Lock the guild's session if one exists and is usable.
    async fn lock(&self, guild_id: GuildId) -> Option<OwnedMutexGuard<Session>> {
        // Clone the handle out so no map shard stays locked across the await.
        let handle = self.sessions.get(&guild_id).map(|e| e.value().clone())?;
        let guard = handle.lock_owned().await;
        guard.is_connected().then_some(guard)
    }

    fn forget(&self, guild_id: GuildId, handle: &Arc<Mutex<Session>>) {
        self.sessions.remove_if(&guild_id, |_, v| Arc::ptr_eq(v, handle));
    }

    /// Reuse the guild's session or create one by joining `voice_channel`.
    ///
    /// Returns the session already locked so the caller's follow-up runs
    /// before any other command on it.
    pub async fn join(
        &self,
        guild_id: GuildId,
        voice_channel: Option<ChannelId>,
    ) -> Result<OwnedMutexGuard<Session>, Error> {
        let channel_id = voice_channel.ok_or(CommandError::NotInVoiceChannel)?;

        loop {
            let handle = self
                .sessions
                .entry(guild_id)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(guild_id, channel_id))))
                .clone();
            let mut session = handle.clone().lock_owned().await;

            match session.state {
                SessionState::Disconnected => {
                    // Lost a race with a teardown; start over with a fresh entry.
                    drop(session);
                    self.forget(guild_id, &handle);
                    continue;
                }
                SessionState::Connecting => {
                    let target = session.channel_id;
                    if let Err(e) = self.engine.connect(guild_id, target).await {
                        session.state = SessionState::Disconnected;
                        drop(session);
                        self.forget(guild_id, &handle);
                        return Err(e);
                    }
                    session.state = SessionState::Idle;
                    info!("Session created for guild {guild_id} in voice channel {target}");
                    return Ok(session);
                }
                _ => return Ok(session),
            }
        }
    }

    /// Resolve `query`, then either start it or put it at the back of the queue.
    pub async fn enqueue_or_play(
        &self,
        guild_id: GuildId,
        voice_channel: Option<ChannelId>,
        query: &str,
    ) -> Result<EnqueueOutcome, Error> {
        let mut session = self.join(guild_id, voice_channel).await?;

        let identifier = resolve_identifier(query, &self.settings.search_prefix);
        debug!("Loading '{identifier}' for guild {guild_id}");
        let track = self
            .engine
            .load_tracks(&identifier)
            .await?
            .into_iter()
            .next()
            .ok_or(CommandError::NoResultsFound)?;

        if session.is_playing() {
            session.queue.push(track.clone());
            return Ok(EnqueueOutcome::Queued(track));
        }

        let volume = self.settings.default_volume;
        self.engine.play(guild_id, &track, Some(volume)).await?;
        session.volume = Some(volume);
        session.start(track.clone());
        Ok(EnqueueOutcome::Started(track))
    }

    /// Upcoming tracks in play order. Empty when there is no session.
    pub async fn list_queue(&self, guild_id: GuildId) -> Vec<Track> {
        match self.lock(guild_id).await {
            Some(session) => session.queue.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub async fn current_track(&self, guild_id: GuildId) -> Option<Track> {
        self.lock(guild_id).await.and_then(|s| s.current.clone())
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> Option<NowPlaying> {
        let session = self.lock(guild_id).await?;
        Some(NowPlaying {
            track: session.current.clone()?,
            mode: session.queue.mode,
            paused: session.state == SessionState::Paused,
            queued: session.queue.len(),
        })
    }

    /// Drop the current track and move on, ignoring loop mode.
    /// Returns the track that was skipped.
    pub async fn skip(&self, guild_id: GuildId) -> Result<Track, Error> {
        let mut session = self.lock(guild_id).await.ok_or(CommandError::NothingPlaying)?;
        if !session.is_playing() {
            return Err(CommandError::NothingPlaying.into());
        }
        let skipped = session.current.clone().ok_or(CommandError::NothingPlaying)?;

        match session.queue.pop_next() {
            Some(next) => {
                if let Err(e) = self.engine.play(guild_id, &next, None).await {
                    session.queue.push_front(next);
                    return Err(e);
                }
                session.start(next);
            }
            None => {
                self.engine.stop(guild_id).await?;
                session.go_idle();
            }
        }
        Ok(skipped)
    }

    /// Leave voice and forget the session. `false` when there was none.
    pub async fn disconnect(&self, guild_id: GuildId) -> Result<bool, Error> {
        let Some(handle) = self.sessions.get(&guild_id).map(|e| e.value().clone()) else {
            return Ok(false);
        };
        let mut session = handle.clone().lock_owned().await;
        if session.state == SessionState::Disconnected {
            return Ok(false);
        }

        let result = self.engine.disconnect(guild_id).await;
        session.state = SessionState::Disconnected;
        drop(session);
        self.forget(guild_id, &handle);
        info!("Session for guild {guild_id} disconnected");
        result.map(|_| true)
    }

    /// Forget the session without talking to the engine, for when the voice
    /// connection is already gone.
    pub async fn destroy(&self, guild_id: GuildId) -> bool {
        let Some(handle) = self.sessions.get(&guild_id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut session = handle.clone().lock_owned().await;
        session.state = SessionState::Disconnected;
        drop(session);
        self.forget(guild_id, &handle);
        info!("Session for guild {guild_id} destroyed");
        true
    }

    pub async fn toggle_loop(&self, guild_id: GuildId) -> Option<LoopToggle> {
        let mut session = self.lock(guild_id).await?;
        session.queue.mode = session.queue.mode.toggled();
        Some(LoopToggle {
            mode: session.queue.mode,
            current_title: session.current.as_ref().map(|t| t.info.title.clone()),
        })
    }

    /// Flip auto-advance. Returns the new setting, or `None` without a session.
    pub async fn toggle_autoplay(&self, guild_id: GuildId) -> Option<bool> {
        let mut session = self.lock(guild_id).await?;
        session.autoplay = !session.autoplay;
        Some(session.autoplay)
    }

    /// Any integer is passed on; the node decides what it accepts.
    pub async fn set_volume(&self, guild_id: GuildId, volume: i32) -> Result<(), Error> {
        let mut session = self.lock(guild_id).await.ok_or(CommandError::NotConnected)?;
        self.engine.set_volume(guild_id, volume).await?;
        session.volume = Some(volume);
        Ok(())
    }

    /// `false` when there is no session.
    pub async fn shuffle(&self, guild_id: GuildId) -> bool {
        match self.lock(guild_id).await {
            Some(mut session) => {
                session.queue.shuffle(&mut rand::rng());
                true
            }
            None => false,
        }
    }

    /// `false` when there is no session.
    pub async fn clear(&self, guild_id: GuildId) -> bool {
        match self.lock(guild_id).await {
            Some(mut session) => {
                session.queue.clear();
                true
            }
            None => false,
        }
    }

    /// Swap in the preset's timescale and push the whole filter set.
    /// `false` when there is no session.
    pub async fn apply_filter(&self, guild_id: GuildId, preset: FilterPreset) -> Result<bool, Error> {
        let Some(mut session) = self.lock(guild_id).await else {
            return Ok(false);
        };
        let filters = session.filters.with_timescale(preset.timescale());
        self.engine.set_filters(guild_id, &filters).await?;
        session.filters = filters;
        debug!("Applied {} filter in guild {guild_id}", preset.name());
        Ok(true)
    }

    /// Pause or resume the current track. Returns its title.
    pub async fn set_paused(&self, guild_id: GuildId, paused: bool) -> Result<String, Error> {
        let mut session = self.lock(guild_id).await.ok_or(CommandError::NotConnected)?;
        let title = match (&session.current, session.is_playing()) {
            (Some(track), true) => track.info.title.clone(),
            _ => return Err(CommandError::NothingPlaying.into()),
        };
        self.engine.pause(guild_id, paused).await?;
        session.state = if paused { SessionState::Paused } else { SessionState::Playing };
        Ok(title)
    }

    /// React to something the node reported.
    pub async fn handle_event(&self, event: PlaybackEvent) -> Result<(), Error> {
        match event {
            PlaybackEvent::TrackEnded { guild_id, encoded, may_start_next } => {
                if !may_start_next {
                    return Ok(());
                }
                self.advance(guild_id, &encoded).await
            }
            PlaybackEvent::TrackFailed { guild_id, message } => {
                warn!("Track failed in guild {guild_id}: {message}");
                Ok(())
            }
            PlaybackEvent::VoiceClosed { guild_id, code, reason } => {
                if !self.contains(guild_id) {
                    return Ok(());
                }
                if !TERMINAL_VOICE_CLOSE_CODES.contains(&code) {
                    debug!("Voice socket closed in guild {guild_id} ({code}: {reason}), node will resume");
                    return Ok(());
                }
                info!("Voice connection lost in guild {guild_id} ({code}: {reason})");
                if let Err(e) = self.engine.disconnect(guild_id).await {
                    warn!("Cleanup after voice loss failed for guild {guild_id}: {e}");
                }
                self.destroy(guild_id).await;
                Ok(())
            }
        }
    }

    /// The current track ran out: repeat it, start the next one, or go idle.
    /// Reports about any track other than the current one are stale.
    async fn advance(&self, guild_id: GuildId, ended: &str) -> Result<(), Error> {
        let Some(mut session) = self.lock(guild_id).await else {
            return Ok(());
        };
        if session.current.as_ref().map(|t| t.encoded.as_str()) != Some(ended) {
            debug!("Ignoring end of a track that is no longer current in guild {guild_id}");
            return Ok(());
        }
        if !session.autoplay {
            session.go_idle();
            return Ok(());
        }

        if session.queue.mode == QueueMode::LoopOne {
            if let Some(current) = session.current.clone() {
                return self.engine.play(guild_id, &current, None).await;
            }
        }

        match session.queue.pop_next() {
            Some(next) => {
                debug!("Advancing guild {guild_id} to '{}'", next.info.title);
                if let Err(e) = self.engine.play(guild_id, &next, None).await {
                    session.go_idle();
                    return Err(e);
                }
                session.start(next);
            }
            None => session.go_idle(),
        }
        Ok(())
    }
}
