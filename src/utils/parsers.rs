//! Text parsing utilities for provider metadata

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "(Official Video)", "(Official Music Video)", and the [..] forms
    static ref OFFICIAL_VIDEO_PATTERN: Regex = Regex::new(
        r"(?i)[\(\[]\s*official\s*(?:music\s*)?video\s*[\)\]]"
    ).unwrap();

    static ref OFFICIAL_AUDIO_PATTERN: Regex = Regex::new(
        r"(?i)[\(\[]\s*official\s*audio\s*[\)\]]"
    ).unwrap();

    static ref LYRIC_VIDEO_PATTERN: Regex = Regex::new(
        r"(?i)[\(\[]\s*lyric\s*video\s*[\)\]]"
    ).unwrap();

    // Page-title suffixes left over from scraped titles
    static ref YOUTUBE_SUFFIX_PATTERN: Regex = Regex::new(
        r"\s*[-|]\s*YouTube$"
    ).unwrap();

    static ref MULTI_SPACE_PATTERN: Regex = Regex::new(r"\s{2,}").unwrap();

    // ISO 8601 duration as used by the YouTube data API, e.g. PT1H2M3S
    static ref ISO_DURATION_PATTERN: Regex = Regex::new(
        r"^P(?:(\d+)D)?T?(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$"
    ).unwrap();
}

/// Strip promotional tags from a YouTube video title
pub fn clean_youtube_title(title: &str) -> String {
    let cleaned = OFFICIAL_VIDEO_PATTERN.replace_all(title, "");
    let cleaned = OFFICIAL_AUDIO_PATTERN.replace_all(&cleaned, "");
    let cleaned = LYRIC_VIDEO_PATTERN.replace_all(&cleaned, "");
    let cleaned = YOUTUBE_SUFFIX_PATTERN.replace(&cleaned, "");
    let cleaned = MULTI_SPACE_PATTERN.replace_all(&cleaned, " ");
    cleaned.trim().to_string()
}

/// Parse an ISO 8601 duration (`PT4M20S`) into whole seconds
pub fn parse_iso8601_duration(value: &str) -> Option<u32> {
    let caps = ISO_DURATION_PATTERN.captures(value.trim())?;

    // "P" or "PT" alone carries no duration
    if caps.iter().skip(1).all(|c| c.is_none()) {
        return None;
    }

    const UNITS: [(usize, u64); 4] = [(1, 86_400), (2, 3600), (3, 60), (4, 1)];

    // provider digits are untrusted; anything past u32 seconds is rejected
    let mut total: u64 = 0;
    for (group, seconds) in UNITS {
        if let Some(m) = caps.get(group) {
            let amount = m.as_str().parse::<u64>().ok()?;
            total = amount.checked_mul(seconds)?.checked_add(total)?;
        }
    }
    u32::try_from(total).ok()
}
