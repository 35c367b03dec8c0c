//! Favorite table operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::track_table::{from_millis, TrackRow, TRACK_COLUMNS};
use crate::models::{FavoriteEntry, TrackKey};

#[derive(Debug, FromRow)]
struct FavoriteRow {
    added_at: i64,
    #[sqlx(flatten)]
    track: TrackRow,
}

/// Favorite table operations
pub struct FavoriteTable;

impl FavoriteTable {
    /// A session's favorites, most recently added first
    pub async fn list(pool: &SqlitePool, session_id: &str) -> Result<Vec<FavoriteEntry>> {
        let sql = format!(
            "SELECT f.added_at, {TRACK_COLUMNS}
             FROM favorite f
             JOIN track t ON t.source = f.source AND t.sid = f.sid
             WHERE f.session_id = ?
             ORDER BY f.added_at DESC, t.sid"
        );
        let rows: Vec<FavoriteRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some(FavoriteEntry {
                    added_at: from_millis(row.added_at),
                    track: row.track.into_track()?,
                })
            })
            .collect())
    }

    /// Favorite a track whose row already exists; false when it already was one
    pub async fn add(
        pool: &SqlitePool,
        session_id: &str,
        key: &TrackKey,
        added_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO favorite (session_id, source, sid, added_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(key.source.as_str())
        .bind(&key.sid)
        .bind(added_at.timestamp_millis())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unfavorite a track; false when it was not a favorite
    pub async fn remove(pool: &SqlitePool, session_id: &str, key: &TrackKey) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM favorite WHERE session_id = ? AND source = ? AND sid = ?")
                .bind(session_id)
                .bind(key.source.as_str())
                .bind(&key.sid)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &SqlitePool, session_id: &str, key: &TrackKey) -> Result<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM favorite WHERE session_id = ? AND source = ? AND sid = ?",
        )
        .bind(session_id)
        .bind(key.source.as_str())
        .bind(&key.sid)
        .fetch_one(pool)
        .await?;

        Ok(row.0 > 0)
    }
}
