//! Audio filter settings pushed to the node as one configuration object.

use serde::{Deserialize, Serialize};

/// Speed/pitch/rate multipliers. 1.0 everywhere means untouched audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timescale {
    pub speed: f64,
    pub pitch: f64,
    pub rate: f64,
}

/// The full filter set of a player.
///
/// Treated as a value: an update builds a new `Filters` and swaps it in whole,
/// the node receives the complete object every time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
}

impl Filters {
    pub fn with_timescale(&self, timescale: Timescale) -> Self {
        Self {
            timescale: Some(timescale),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPreset {
    Nightcore,
    Slowed,
}

impl FilterPreset {
    pub fn timescale(self) -> Timescale {
        match self {
            FilterPreset::Nightcore => Timescale { pitch: 1.2, speed: 1.2, rate: 1.0 },
            FilterPreset::Slowed => Timescale { pitch: 0.9, speed: 0.8, rate: 1.0 },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterPreset::Nightcore => "nightcore",
            FilterPreset::Slowed => "slowed",
        }
    }
}
