//! Playback resolution result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How (or whether) a track can be streamed.
///
/// The variant alone decides which affordance the client renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Playable {
    /// Stream immediately
    #[serde(rename_all = "camelCase")]
    Direct {
        stream_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at: Option<DateTime<Utc>>,
        #[serde(default)]
        is_live: bool,
    },
    /// Short clip only, not the full track
    #[serde(rename_all = "camelCase")]
    Preview {
        stream_url: String,
        duration: u32,
        message: String,
    },
    /// Nothing streamable; offer "open in {source}"
    #[serde(rename_all = "camelCase")]
    External {
        external_url: String,
        message: String,
    },
}

impl Playable {
    pub fn external(url: impl Into<String>, message: impl Into<String>) -> Self {
        Playable::External {
            external_url: url.into(),
            message: message.into(),
        }
    }

    /// URL the media element should load, if any
    pub fn stream_url(&self) -> Option<&str> {
        match self {
            Playable::Direct { stream_url, .. } | Playable::Preview { stream_url, .. } => {
                Some(stream_url)
            }
            Playable::External { .. } => None,
        }
    }

    pub fn is_streamable(&self) -> bool {
        self.stream_url().is_some()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Playable::Direct { .. } => "direct",
            Playable::Preview { .. } => "preview",
            Playable::External { .. } => "external",
        }
    }
}
