//! Listening history table operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::track_table::{from_millis, TrackRow, TRACK_COLUMNS};
use crate::models::{HistoryAggregate, HistoryEntry, Track};

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: i64,
    played_at: i64,
    #[sqlx(flatten)]
    track: TrackRow,
}

#[derive(Debug, FromRow)]
struct AggregateRow {
    last_played: i64,
    play_count: i64,
    #[sqlx(flatten)]
    track: TrackRow,
}

/// One page of history plus the total row count the page was cut from
#[derive(Debug)]
pub struct HistoryPage<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// History table operations
pub struct HistoryTable;

impl HistoryTable {
    /// Record a play; the track row must already exist
    pub async fn insert(
        pool: &SqlitePool,
        session_id: &str,
        track: &Track,
        played_at: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO history (session_id, source, sid, played_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(track.source.as_str())
        .bind(&track.sid)
        .bind(played_at.timestamp_millis())
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Plays newest first, optionally limited to plays at or after `since`
    pub async fn list(
        pool: &SqlitePool,
        session_id: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<HistoryPage<HistoryEntry>> {
        let since = since.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);

        let sql = format!(
            "SELECT h.id, h.played_at, {TRACK_COLUMNS}
             FROM history h
             JOIN track t ON t.source = h.source AND t.sid = h.sid
             WHERE h.session_id = ? AND h.played_at >= ?
             ORDER BY h.played_at DESC, h.id DESC
             LIMIT ? OFFSET ?"
        );
        let rows: Vec<HistoryRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .bind(since)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM history WHERE session_id = ? AND played_at >= ?",
        )
        .bind(session_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        let items = rows
            .into_iter()
            .filter_map(|row| {
                Some(HistoryEntry {
                    id: row.id,
                    played_at: from_millis(row.played_at),
                    track: row.track.into_track()?,
                })
            })
            .collect();

        Ok(HistoryPage {
            items,
            total: total.0,
        })
    }

    /// One row per distinct track with its latest play and play count
    pub async fn list_unique(
        pool: &SqlitePool,
        session_id: &str,
        since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<HistoryPage<HistoryAggregate>> {
        let since = since.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);

        let sql = format!(
            "SELECT g.last_played, g.play_count, {TRACK_COLUMNS}
             FROM (
                 SELECT source, sid, MAX(played_at) AS last_played, COUNT(*) AS play_count
                 FROM history
                 WHERE session_id = ? AND played_at >= ?
                 GROUP BY source, sid
             ) g
             JOIN track t ON t.source = g.source AND t.sid = g.sid
             ORDER BY g.last_played DESC
             LIMIT ? OFFSET ?"
        );
        let rows: Vec<AggregateRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .bind(since)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM (
                 SELECT 1 FROM history WHERE session_id = ? AND played_at >= ?
                 GROUP BY source, sid
             )",
        )
        .bind(session_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        let items = rows
            .into_iter()
            .filter_map(|row| {
                Some(HistoryAggregate {
                    played_at: from_millis(row.last_played),
                    play_count: row.play_count,
                    track: row.track.into_track()?,
                })
            })
            .collect();

        Ok(HistoryPage {
            items,
            total: total.0,
        })
    }

    /// Delete a session's plays at or after `since` (all of them when None)
    pub async fn clear(
        pool: &SqlitePool,
        session_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let since = since.map(|s| s.timestamp_millis()).unwrap_or(i64::MIN);
        let result = sqlx::query("DELETE FROM history WHERE session_id = ? AND played_at >= ?")
            .bind(session_id)
            .bind(since)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Drop plays older than `cutoff` across all sessions
    pub async fn prune_older_than(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history WHERE played_at < ?")
            .bind(cutoff.timestamp_millis())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
