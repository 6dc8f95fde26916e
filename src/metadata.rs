/*
 *  metadata.rs
 *
 *  HiFiOLED - now playing, twice over
 *  (c) 2020-26 Stuart Hunter
 *
 *  Track metadata snapshots and inbound player messages
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::deutils::{
    deserialize_lenient_f64,
    deserialize_non_empty,
    deserialize_numeric_u8,
};

/// One snapshot from the media player, replaced wholesale on every update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(default)]
    pub player_name: String,
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub position_seconds: f64,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration_seconds: f64,
    #[serde(default, deserialize_with = "deserialize_non_empty")]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub playing: bool,
}

impl TrackMetadata {
    pub fn new(player_name: &str, title: &str, artist: &str, position: f64, duration: f64) -> Self {
        Self {
            player_name: player_name.to_string(),
            title: Some(title.to_string()).filter(|t| !t.is_empty()),
            artist: Some(artist.to_string()).filter(|a| !a.is_empty()),
            position_seconds: position,
            duration_seconds: duration,
            ..Default::default()
        }
    }

    /// Neither title nor artist, nothing worth a track panel
    pub fn is_blank(&self) -> bool {
        self.title.is_none() && self.artist.is_none()
    }

    /// Same song on the same player, position and duration ignored
    pub fn same_content(&self, other: &TrackMetadata) -> bool {
        self.title == other.title
            && self.artist == other.artist
            && self.player_name == other.player_name
    }

    /// Position to draw, `since_update` after the snapshot arrived.
    ///
    /// Only advances while playing, and never runs
    /// past a known duration.
    pub fn position_at(&self, since_update: Duration) -> f64 {
        let base = if self.position_seconds.is_finite() { self.position_seconds.max(0.0) } else { 0.0 };
        let pos = if self.playing { base + since_update.as_secs_f64() } else { base };
        if self.duration_seconds.is_finite() && self.duration_seconds > 0.0 {
            pos.min(self.duration_seconds)
        } else {
            pos
        }
    }
}

/// A line from the player bridge
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Metadata(TrackMetadata),
    Volume {
        #[serde(deserialize_with = "deserialize_numeric_u8")]
        percent: u8,
    },
}

impl InboundMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
