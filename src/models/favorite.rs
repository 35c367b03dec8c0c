//! Favorited tracks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Track;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub track: Track,
    pub added_at: DateTime<Utc>,
}
