//! Enums shared by the hub

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Music provider a track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Youtube,
    Ytmusic,
    Soundcloud,
    Spotify,
    Deezer,
    Radio,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Youtube,
        Source::Ytmusic,
        Source::Soundcloud,
        Source::Spotify,
        Source::Deezer,
        Source::Radio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Youtube => "youtube",
            Source::Ytmusic => "ytmusic",
            Source::Soundcloud => "soundcloud",
            Source::Spotify => "spotify",
            Source::Deezer => "deezer",
            Source::Radio => "radio",
        }
    }

    /// Human readable provider name
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Youtube => "YouTube",
            Source::Ytmusic => "YouTube Music",
            Source::Soundcloud => "SoundCloud",
            Source::Spotify => "Spotify",
            Source::Deezer => "Deezer",
            Source::Radio => "Radio",
        }
    }

    /// Canonical web page for a source-scoped id, where the id alone is enough
    pub fn canonical_url(&self, sid: &str) -> Option<String> {
        match self {
            Source::Youtube => Some(format!("https://www.youtube.com/watch?v={}", sid)),
            Source::Ytmusic => Some(format!("https://music.youtube.com/watch?v={}", sid)),
            Source::Spotify => Some(format!("https://open.spotify.com/track/{}", sid)),
            Source::Deezer => Some(format!("https://www.deezer.com/track/{}", sid)),
            Source::Soundcloud | Source::Radio => None,
        }
    }

    /// Parse a comma separated source list, accepting short aliases.
    /// Unknown entries are skipped; duplicates collapse.
    pub fn parse_list(list: &str) -> Vec<Source> {
        let mut sources = Vec::new();
        for part in list.split(',') {
            if let Ok(source) = part.parse::<Source>() {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }
        sources
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yt" | "youtube" => Ok(Source::Youtube),
            "ytm" | "ytmusic" => Ok(Source::Ytmusic),
            "sc" | "soundcloud" => Ok(Source::Soundcloud),
            "sp" | "spotify" => Ok(Source::Spotify),
            "dz" | "deezer" => Ok(Source::Deezer),
            "radio" => Ok(Source::Radio),
            other => Err(format!("unsupported source: {}", other)),
        }
    }
}

/// Repeat behaviour of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(RepeatMode::Off),
            "one" => Ok(RepeatMode::One),
            "all" => Ok(RepeatMode::All),
            other => Err(format!("invalid repeat mode: {}", other)),
        }
    }
}

/// Where `add_to_queue` inserts a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePosition {
    #[default]
    End,
    Next,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_aliases() {
        assert_eq!("yt".parse::<Source>().unwrap(), Source::Youtube);
        assert_eq!("SC".parse::<Source>().unwrap(), Source::Soundcloud);
        assert_eq!(" dz ".parse::<Source>().unwrap(), Source::Deezer);
        assert!("napster".parse::<Source>().is_err());
    }

    #[test]
    fn test_parse_list_skips_unknown_and_duplicates() {
        let sources = Source::parse_list("yt,sp,foo,youtube,radio");
        assert_eq!(sources, vec![Source::Youtube, Source::Spotify, Source::Radio]);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Source::Ytmusic).unwrap();
        assert_eq!(json, "\"ytmusic\"");
        let mode: RepeatMode = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(mode, RepeatMode::All);
    }
}
