//! Records "track started" events into the listening history

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;

use crate::core::driver::HistoryRecorder;
use crate::db::{HistoryTable, TrackTable};
use crate::models::Track;

pub struct SqlHistoryRecorder {
    pool: SqlitePool,
    session_id: String,
}

impl SqlHistoryRecorder {
    pub fn new(pool: SqlitePool, session_id: impl Into<String>) -> Self {
        Self {
            pool,
            session_id: session_id.into(),
        }
    }
}

/// Upsert the track, then append a play for it
pub async fn record_play(pool: &SqlitePool, session_id: &str, track: &Track) -> anyhow::Result<i64> {
    TrackTable::upsert(pool, track).await?;
    HistoryTable::insert(pool, session_id, track, Utc::now()).await
}

impl HistoryRecorder for SqlHistoryRecorder {
    fn record(&self, track: &Track) {
        let pool = self.pool.clone();
        let session_id = self.session_id.clone();
        let track = track.clone();

        tokio::spawn(async move {
            if let Err(e) = record_play(&pool, &session_id, &track).await {
                error!("Failed to record history for {}: {}", track.key(), e);
            }
        });
    }
}
