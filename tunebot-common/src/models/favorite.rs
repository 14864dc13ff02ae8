use serde::{Deserialize, Serialize};

use crate::models::ids::UserId;
use crate::models::track::Track;

/// One saved track for one user. Rows are append-only and may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub user_id: UserId,
    pub song_title: String,
    pub song_author: String,
    pub song_url: Option<String>,
}

impl FavoriteEntry {
    pub fn from_track(user_id: UserId, track: &Track) -> Self {
        Self {
            user_id,
            song_title: track.info.title.clone(),
            song_author: track.info.author.clone(),
            song_url: track.info.uri.clone(),
        }
    }

    pub fn display_line(&self) -> String {
        match &self.song_url {
            Some(url) => format!("**{}** by `{}` - [Link]({})", self.song_title, self.song_author, url),
            None => format!("**{}** by `{}`", self.song_title, self.song_author),
        }
    }
}
