//! Track table operations

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::models::{Source, Track};

/// Track columns for joins aliasing the track table as `t`
pub(crate) const TRACK_COLUMNS: &str = "t.source, t.sid, t.title, t.artist, t.album, \
     t.thumbnail_url, t.duration, t.url, t.stream_url, t.explicit, t.metadata";

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Database row for track table
#[derive(Debug, FromRow)]
pub(crate) struct TrackRow {
    pub source: String,
    pub sid: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i64>,
    pub url: String,
    pub stream_url: Option<String>,
    pub explicit: bool,
    pub metadata: String,
}

impl TrackRow {
    /// None for rows written by a build that knew more sources
    pub fn into_track(self) -> Option<Track> {
        let source: Source = self.source.parse().ok()?;
        let mut track = Track::new(source, self.sid, &self.title, &self.artist, self.url)
            .with_album(self.album.as_deref())
            .with_thumbnail(self.thumbnail_url)
            .with_duration(self.duration.and_then(|d| u32::try_from(d).ok()))
            .with_stream_url(self.stream_url)
            .with_explicit(self.explicit);
        track.metadata = serde_json::from_str(&self.metadata).unwrap_or_default();
        Some(track)
    }
}

/// Track table operations
pub struct TrackTable;

impl TrackTable {
    /// Insert or refresh a track
    pub async fn upsert(pool: &SqlitePool, track: &Track) -> Result<()> {
        let metadata = serde_json::to_string(&track.metadata).unwrap_or_else(|_| "{}".to_string());

        sqlx::query(
            r#"
            INSERT INTO track (source, sid, title, artist, album, thumbnail_url, duration,
                               url, stream_url, explicit, metadata, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source, sid) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                thumbnail_url = excluded.thumbnail_url,
                duration = excluded.duration,
                url = excluded.url,
                stream_url = excluded.stream_url,
                explicit = excluded.explicit,
                metadata = excluded.metadata,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(track.source.as_str())
        .bind(&track.sid)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(&track.thumbnail_url)
        .bind(track.duration.map(i64::from))
        .bind(&track.url)
        .bind(&track.stream_url)
        .bind(track.explicit)
        .bind(metadata)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Upsert many tracks in one transaction
    pub async fn upsert_many<'a>(
        pool: &SqlitePool,
        tracks: impl IntoIterator<Item = &'a Track>,
    ) -> Result<usize> {
        let mut tx = pool.begin().await?;
        let now = Utc::now().timestamp();
        let mut count = 0;

        for track in tracks {
            let metadata =
                serde_json::to_string(&track.metadata).unwrap_or_else(|_| "{}".to_string());
            sqlx::query(
                r#"
                INSERT INTO track (source, sid, title, artist, album, thumbnail_url, duration,
                                   url, stream_url, explicit, metadata, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(source, sid) DO UPDATE SET
                    title = excluded.title,
                    artist = excluded.artist,
                    album = excluded.album,
                    thumbnail_url = excluded.thumbnail_url,
                    duration = excluded.duration,
                    url = excluded.url,
                    stream_url = excluded.stream_url,
                    explicit = excluded.explicit,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(track.source.as_str())
            .bind(&track.sid)
            .bind(&track.title)
            .bind(&track.artist)
            .bind(&track.album)
            .bind(&track.thumbnail_url)
            .bind(track.duration.map(i64::from))
            .bind(&track.url)
            .bind(&track.stream_url)
            .bind(track.explicit)
            .bind(metadata)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            count += 1;
        }

        tx.commit().await?;
        Ok(count)
    }

    /// Look a track up by identity
    pub async fn get(pool: &SqlitePool, source: Source, sid: &str) -> Result<Option<Track>> {
        let row: Option<TrackRow> = sqlx::query_as(
            "SELECT source, sid, title, artist, album, thumbnail_url, duration, url, stream_url, explicit, metadata
             FROM track WHERE source = ? AND sid = ?",
        )
        .bind(source.as_str())
        .bind(sid)
        .fetch_optional(pool)
        .await?;

        Ok(row.and_then(TrackRow::into_track))
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM track")
            .fetch_one(pool)
            .await?;
        Ok(count.0)
    }
}
