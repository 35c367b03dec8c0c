//! Listening history entries

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Track;

/// One play of a track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(flatten)]
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

/// A track with its aggregated play count, for the "unique" history view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAggregate {
    #[serde(flatten)]
    pub track: Track,
    pub played_at: DateTime<Utc>,
    pub play_count: i64,
}

/// Time window for history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryRange {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "1y")]
    Year,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl HistoryRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::Week => "7d",
            HistoryRange::Month => "30d",
            HistoryRange::Year => "1y",
            HistoryRange::All => "all",
        }
    }

    /// Earliest `played_at` included in the range
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            HistoryRange::Week => Some(now - Duration::days(7)),
            HistoryRange::Month => Some(now - Duration::days(30)),
            HistoryRange::Year => Some(now - Duration::days(365)),
            HistoryRange::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff() {
        let now = Utc::now();
        assert_eq!(HistoryRange::Week.cutoff(now), Some(now - Duration::days(7)));
        assert!(HistoryRange::All.cutoff(now).is_none());
        let range: HistoryRange = serde_json::from_str("\"30d\"").unwrap();
        assert_eq!(range, HistoryRange::Month);
    }
}
