use std::collections::VecDeque;

use rand::Rng;
use rand::seq::SliceRandom;

use tunebot_common::models::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueMode {
    #[default]
    Normal,
    /// Replay the current track when it finishes.
    LoopOne,
}

impl QueueMode {
    pub fn toggled(self) -> Self {
        match self {
            QueueMode::Normal => QueueMode::LoopOne,
            QueueMode::LoopOne => QueueMode::Normal,
        }
    }
}

/// Upcoming tracks of a session. The playing track is not part of it.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: VecDeque<Track>,
    pub mode: QueueMode,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    pub fn pop_next(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Put back a track that was taken with `pop_next` but could not be played.
    pub(crate) fn push_front(&mut self, track: Track) {
        self.tracks.push_front(track);
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tracks.make_contiguous().shuffle(rng);
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
