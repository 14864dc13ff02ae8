use serde::{Deserialize, Serialize};

/// A playable track as resolved by the audio node.
///
/// `encoded` is opaque to the bot; it is handed back to the node verbatim
/// when the track should be played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub encoded: String,
    pub info: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub is_seekable: bool,
    pub author: String,
    /// Duration in milliseconds. 0 for streams.
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub is_stream: bool,
    #[serde(default)]
    pub position: u64,
    pub title: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub source_name: String,
}

impl Track {
    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn author(&self) -> &str {
        &self.info.author
    }

    pub fn uri(&self) -> Option<&str> {
        self.info.uri.as_deref()
    }

    /// Queue line as shown in chat: **title** by `author`
    pub fn display_line(&self) -> String {
        format!("**{}** by `{}`", self.info.title, self.info.author)
    }
}
