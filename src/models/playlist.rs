//! User playlists

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Track;

/// Longest accepted playlist name, in characters
pub const MAX_PLAYLIST_NAME_LEN: usize = 100;
/// Longest accepted playlist description, in characters
pub const MAX_PLAYLIST_DESCRIPTION_LEN: usize = 500;

/// Where a track lands when added to a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistPosition {
    Start,
    #[default]
    End,
}

/// A track inside a playlist
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistTrack {
    #[serde(flatten)]
    pub track: Track,
    pub added_at: DateTime<Utc>,
}

/// A playlist with its ordered tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub is_public: bool,
    pub track_count: usize,
    /// Sum of known track durations, in seconds
    pub total_duration: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tracks: Vec<PlaylistTrack>,
}

impl Playlist {
    /// Recompute the derived counters from `tracks`
    pub fn with_totals(mut self) -> Self {
        self.track_count = self.tracks.len();
        self.total_duration = self
            .tracks
            .iter()
            .filter_map(|entry| entry.track.duration)
            .map(u64::from)
            .sum();
        self
    }
}

/// Changes applied by a playlist update; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct PlaylistChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub cover_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    #[test]
    fn test_totals_skip_live_tracks() {
        let now = Utc::now();
        let entry = |sid: &str, duration| PlaylistTrack {
            track: Track::new(Source::Deezer, sid, "Song", "Band", "").with_duration(duration),
            added_at: now,
        };
        let playlist = Playlist {
            id: 1,
            name: "Mix".to_string(),
            description: String::new(),
            cover_url: None,
            is_public: false,
            track_count: 0,
            total_duration: 0,
            created_at: now,
            updated_at: now,
            tracks: vec![entry("1", Some(200)), entry("2", None), entry("3", Some(45))],
        }
        .with_totals();

        assert_eq!(playlist.track_count, 3);
        assert_eq!(playlist.total_duration, 245);
        let position: PlaylistPosition = serde_json::from_str("\"start\"").unwrap();
        assert_eq!(position, PlaylistPosition::Start);
    }
}
