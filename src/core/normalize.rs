//! Coercions every source adapter applies when building a `Track`

use serde_json::Value;

pub use crate::utils::parsers::{clean_youtube_title, parse_iso8601_duration};

/// Maximum length of title, artist and album fields
pub const MAX_TEXT_LEN: usize = 200;
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Truncate to at most `max` characters without splitting a code point
pub fn bounded(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Provider durations in milliseconds, floored to whole seconds
pub fn duration_from_millis(ms: Option<u64>) -> Option<u32> {
    ms.filter(|ms| *ms > 0).map(|ms| (ms / 1000) as u32)
}

/// Provider durations already in seconds, dropping zero/negative values
pub fn duration_from_secs(secs: Option<i64>) -> Option<u32> {
    secs.filter(|s| *s > 0).map(|s| s as u32)
}

/// Missing or blank artist names become "Unknown Artist"
pub fn artist_or_unknown(artist: Option<&str>) -> String {
    match artist.map(str::trim) {
        Some(a) if !a.is_empty() => a.to_string(),
        _ => UNKNOWN_ARTIST.to_string(),
    }
}

/// Join several artist names the way multi-artist providers list them
pub fn join_artists<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let joined = names
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    artist_or_unknown(Some(&joined))
}

/// Stringify a provider id that may arrive as a number or a string
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
