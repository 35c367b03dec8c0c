//! Radio station model

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Source, Track};

const DEFAULT_STATION_IMAGE: &str = "/galaxy-logo.png";

/// A live internet radio station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioStation {
    pub name: String,
    pub url: String,
    pub genre: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl RadioStation {
    /// Station ids are the base64 encoded stream url
    pub fn sid(&self) -> String {
        encode_station_id(&self.url)
    }

    /// Case-insensitive match on name, genre, country or description
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.genre.to_lowercase().contains(&needle)
            || self.country.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }

    pub fn to_track(&self) -> Track {
        Track::new(Source::Radio, self.sid(), &self.name, &self.genre, self.url.clone())
            .with_album(Some(&self.country))
            .with_thumbnail(Some(
                self.thumbnail_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STATION_IMAGE.to_string()),
            ))
            .with_stream_url(Some(self.url.clone()))
            .with_meta("genre", json!(self.genre))
            .with_meta("country", json!(self.country))
            .with_meta("bitrate", json!(self.bitrate))
            .with_meta("description", json!(self.description))
            .with_meta("isLive", json!(true))
    }
}

pub fn encode_station_id(url: &str) -> String {
    STANDARD.encode(url.as_bytes())
}

/// Decode a station id back into its stream url
pub fn decode_station_id(sid: &str) -> Option<String> {
    let bytes = STANDARD.decode(sid.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Stations shipped with the hub when no `stations.json` is configured
pub fn default_stations() -> Vec<RadioStation> {
    let station = |name: &str, url: &str, genre: &str, country: &str| RadioStation {
        name: name.to_string(),
        url: url.to_string(),
        genre: genre.to_string(),
        country: country.to_string(),
        description: None,
        bitrate: None,
        thumbnail_url: None,
    };

    vec![
        RadioStation {
            description: Some("24/7 chill beats to relax/study to".to_string()),
            ..station(
                "Lofi Hip Hop Radio",
                "https://www.youtube.com/watch?v=jfKfPfyJRdk",
                "Lo-Fi",
                "International",
            )
        },
        RadioStation {
            bitrate: Some(128),
            ..station(
                "Jazz FM",
                "https://jazz-icy.ice.infomaniak.ch/jazz-icy.mp3",
                "Jazz",
                "International",
            )
        },
        RadioStation {
            bitrate: Some(320),
            ..station(
                "Chillhop Radio",
                "https://streams.fluxfm.de/Chillhop/mp3-320/streams.fluxfm.de/",
                "Chillhop",
                "International",
            )
        },
        RadioStation {
            bitrate: Some(128),
            ..station(
                "Electronic Dance Music",
                "https://streams.ilovemusic.de/iloveradio104.mp3",
                "Electronic",
                "Germany",
            )
        },
        RadioStation {
            bitrate: Some(192),
            ..station(
                "Classic Rock",
                "https://streams.radiobob.de/bob-classicrock/mp3-192/streams.radiobob.de/",
                "Rock",
                "Germany",
            )
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_id_decodes_to_url() {
        let station = &default_stations()[1];
        let sid = station.sid();
        assert_eq!(decode_station_id(&sid).as_deref(), Some(station.url.as_str()));
        assert!(decode_station_id("not base64 !!").is_none());
    }

    #[test]
    fn test_to_track_is_live_without_duration() {
        let track = default_stations()[4].to_track();
        assert_eq!(track.source, Source::Radio);
        assert_eq!(track.artist, "Rock");
        assert_eq!(track.album.as_deref(), Some("Germany"));
        assert!(track.duration.is_none());
        assert_eq!(track.stream_url.as_deref(), Some(track.url.as_str()));
        assert_eq!(track.metadata["isLive"], true);
    }

    #[test]
    fn test_matches_description() {
        let stations = default_stations();
        assert!(stations[0].matches("STUDY"));
        assert!(!stations[1].matches("study"));
        assert!(stations[1].matches(""));
    }
}
