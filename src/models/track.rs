//! Track model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::Source;
use crate::core::normalize::{bounded, MAX_TEXT_LEN, UNKNOWN_ARTIST, UNKNOWN_TITLE};

/// Identity of a track: unique only as the `(source, sid)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackKey {
    pub source: Source,
    pub sid: String,
}

impl TrackKey {
    pub fn new(source: Source, sid: impl Into<String>) -> Self {
        Self {
            source,
            sid: sid.into(),
        }
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.sid)
    }
}

/// Parses `source:sid`; the sid may itself contain colons
impl FromStr for TrackKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, sid) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid track id: {}", s))?;
        let sid = sid.trim();
        if sid.is_empty() {
            return Err(format!("Invalid track id: {}", s));
        }
        Ok(TrackKey::new(source.parse()?, sid))
    }
}

/// A normalized, source-tagged unit of playable metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub source: Source,
    /// Source-scoped identifier
    pub sid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Whole seconds; absent for live streams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Canonical web page, used as the external fallback
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub explicit: bool,
    /// Source-specific extras, never interpreted by the player
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Track {
    /// Create a track, applying the display bounds and fallbacks
    pub fn new(
        source: Source,
        sid: impl Into<String>,
        title: &str,
        artist: &str,
        url: impl Into<String>,
    ) -> Self {
        let title = if title.trim().is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            bounded(title.trim(), MAX_TEXT_LEN)
        };
        let artist = if artist.trim().is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            bounded(artist.trim(), MAX_TEXT_LEN)
        };

        Self {
            source,
            sid: sid.into(),
            title,
            artist,
            album: None,
            thumbnail_url: None,
            duration: None,
            url: url.into(),
            stream_url: None,
            explicit: false,
            metadata: Map::new(),
        }
    }

    pub fn with_album(mut self, album: Option<&str>) -> Self {
        self.album = album
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| bounded(a, MAX_TEXT_LEN));
        self
    }

    pub fn with_thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_duration(mut self, seconds: Option<u32>) -> Self {
        self.duration = seconds;
        self
    }

    pub fn with_stream_url(mut self, url: Option<String>) -> Self {
        self.stream_url = url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_explicit(mut self, explicit: bool) -> Self {
        self.explicit = explicit;
        self
    }

    /// Insert a metadata entry, skipping nulls
    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        if !value.is_null() {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(self.source, self.sid.clone())
    }

    /// Identity comparison; no other field takes part
    pub fn same_as(&self, other: &Track) -> bool {
        self.source == other.source && self.sid == other.sid
    }

    pub fn is(&self, key: &TrackKey) -> bool {
        self.source == key.source && self.sid == key.sid
    }

    /// URL to send the user to when the track cannot be streamed
    pub fn fallback_url(&self) -> String {
        if !self.url.is_empty() {
            return self.url.clone();
        }
        self.source.canonical_url(&self.sid).unwrap_or_default()
    }

    /// Fill in fallbacks on a track received from a client
    pub fn normalized(self) -> Self {
        let mut track = Track::new(self.source, self.sid, &self.title, &self.artist, self.url)
            .with_album(self.album.as_deref())
            .with_thumbnail(self.thumbnail_url)
            .with_duration(self.duration)
            .with_stream_url(self.stream_url)
            .with_explicit(self.explicit);
        track.metadata = self.metadata;
        track
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_other_fields() {
        let a = Track::new(Source::Deezer, "42", "Song", "Band", "https://x");
        let mut b = a.clone();
        b.title = "Other title".to_string();
        b.explicit = true;
        assert!(a.same_as(&b));

        let c = Track::new(Source::Spotify, "42", "Song", "Band", "https://x");
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_key_parses_display_form() {
        let key: TrackKey = "spotify:abc".parse().unwrap();
        assert_eq!(key, TrackKey::new(Source::Spotify, "abc"));
        assert_eq!(key.to_string().parse::<TrackKey>().unwrap(), key);

        let key: TrackKey = "yt:a:b".parse().unwrap();
        assert_eq!(key.sid, "a:b");

        assert!("nosource".parse::<TrackKey>().is_err());
        assert!("deezer:".parse::<TrackKey>().is_err());
        assert!("napster:1".parse::<TrackKey>().is_err());
    }

    #[test]
    fn test_fallbacks_and_bounds() {
        let long = "x".repeat(300);
        let track = Track::new(Source::Soundcloud, "1", "  ", &long, "");
        assert_eq!(track.title, UNKNOWN_TITLE);
        assert_eq!(track.artist.chars().count(), MAX_TEXT_LEN);
        assert!(!track.explicit);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let track = Track::new(Source::Radio, "aHR0cA==", "Jazz FM", "Jazz", "http://s")
            .with_stream_url(Some("http://s".to_string()))
            .with_thumbnail(Some("http://img".to_string()));
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["streamUrl"], "http://s");
        assert_eq!(json["thumbnailUrl"], "http://img");
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn test_fallback_url_uses_canonical() {
        let track = Track::new(Source::Youtube, "abc", "t", "a", "");
        assert_eq!(track.fallback_url(), "https://www.youtube.com/watch?v=abc");
    }
}
