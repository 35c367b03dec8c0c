//! Playlist table operations

use anyhow::Result;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;

use super::track_table::{from_millis, TrackRow, TRACK_COLUMNS};
use crate::models::{Playlist, PlaylistChanges, PlaylistPosition, PlaylistTrack, TrackKey};

/// Database row for playlist table
#[derive(Debug, FromRow)]
struct PlaylistRow {
    id: i64,
    name: String,
    description: String,
    cover_url: Option<String>,
    is_public: bool,
    created_at: i64,
    updated_at: i64,
}

impl PlaylistRow {
    fn into_playlist(self, tracks: Vec<PlaylistTrack>) -> Playlist {
        Playlist {
            id: self.id,
            name: self.name,
            description: self.description,
            cover_url: self.cover_url,
            is_public: self.is_public,
            track_count: 0,
            total_duration: 0,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
            tracks,
        }
        .with_totals()
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    playlist_id: i64,
    added_at: i64,
    #[sqlx(flatten)]
    track: TrackRow,
}

const PLAYLIST_COLUMNS: &str =
    "id, name, description, cover_url, is_public, created_at, updated_at";

/// Playlist table operations
pub struct PlaylistTable;

impl PlaylistTable {
    /// A session's playlists with their tracks, most recently updated first
    pub async fn all(pool: &SqlitePool, session_id: &str) -> Result<Vec<Playlist>> {
        let sql = format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlist
             WHERE session_id = ?
             ORDER BY updated_at DESC, id DESC"
        );
        let rows: Vec<PlaylistRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await?;

        let sql = format!(
            "SELECT pt.playlist_id, pt.added_at, {TRACK_COLUMNS}
             FROM playlist_track pt
             JOIN playlist p ON p.id = pt.playlist_id
             JOIN track t ON t.source = pt.source AND t.sid = pt.sid
             WHERE p.session_id = ?
             ORDER BY pt.playlist_id, pt.position"
        );
        let entries: Vec<EntryRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_all(pool)
            .await?;

        let mut tracks: HashMap<i64, Vec<PlaylistTrack>> = HashMap::new();
        for entry in entries {
            if let Some(track) = entry.track.into_track() {
                tracks.entry(entry.playlist_id).or_default().push(PlaylistTrack {
                    track,
                    added_at: from_millis(entry.added_at),
                });
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = tracks.remove(&row.id).unwrap_or_default();
                row.into_playlist(items)
            })
            .collect())
    }

    /// Get a playlist owned by `session_id`
    pub async fn get(pool: &SqlitePool, session_id: &str, id: i64) -> Result<Option<Playlist>> {
        let sql = format!("SELECT {PLAYLIST_COLUMNS} FROM playlist WHERE id = ? AND session_id = ?");
        let row: Option<PlaylistRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(session_id)
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT pt.playlist_id, pt.added_at, {TRACK_COLUMNS}
             FROM playlist_track pt
             JOIN track t ON t.source = pt.source AND t.sid = pt.sid
             WHERE pt.playlist_id = ?
             ORDER BY pt.position"
        );
        let entries: Vec<EntryRow> = sqlx::query_as(&sql).bind(id).fetch_all(pool).await?;
        let items = entries
            .into_iter()
            .filter_map(|entry| {
                Some(PlaylistTrack {
                    added_at: from_millis(entry.added_at),
                    track: entry.track.into_track()?,
                })
            })
            .collect();

        Ok(Some(row.into_playlist(items)))
    }

    /// Insert an empty playlist
    pub async fn insert(
        pool: &SqlitePool,
        session_id: &str,
        name: &str,
        description: &str,
        is_public: bool,
    ) -> Result<i64> {
        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            "INSERT INTO playlist (session_id, name, description, is_public, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(name)
        .bind(description)
        .bind(is_public)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Check if a session already has a playlist called `name`, other than `except`
    pub async fn name_exists(
        pool: &SqlitePool,
        session_id: &str,
        name: &str,
        except: Option<i64>,
    ) -> Result<bool> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM playlist WHERE session_id = ? AND name = ? AND id != ?",
        )
        .bind(session_id)
        .bind(name)
        .bind(except.unwrap_or(-1))
        .fetch_one(pool)
        .await?;

        Ok(row.0 > 0)
    }

    /// Apply the set fields of `changes`; false when no such playlist
    pub async fn update(
        pool: &SqlitePool,
        session_id: &str,
        id: i64,
        changes: &PlaylistChanges,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE playlist SET
                 name = COALESCE(?, name),
                 description = COALESCE(?, description),
                 is_public = COALESCE(?, is_public),
                 cover_url = COALESCE(?, cover_url),
                 updated_at = ?
             WHERE id = ? AND session_id = ?",
        )
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.is_public)
        .bind(&changes.cover_url)
        .bind(Utc::now().timestamp_millis())
        .bind(id)
        .bind(session_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a playlist and its entries
    pub async fn delete(pool: &SqlitePool, session_id: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM playlist WHERE id = ? AND session_id = ?")
            .bind(id)
            .bind(session_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add a track whose row already exists; false when it is already in the playlist
    pub async fn add_track(
        pool: &SqlitePool,
        id: i64,
        key: &TrackKey,
        position: PlaylistPosition,
    ) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let edge = match position {
            PlaylistPosition::Start => {
                "SELECT COALESCE(MIN(position), 0) - 1 FROM playlist_track WHERE playlist_id = ?"
            }
            PlaylistPosition::End => {
                "SELECT COALESCE(MAX(position), -1) + 1 FROM playlist_track WHERE playlist_id = ?"
            }
        };
        let (slot,): (i64,) = sqlx::query_as(edge).bind(id).fetch_one(&mut *tx).await?;

        let now = Utc::now().timestamp_millis();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO playlist_track (playlist_id, source, sid, position, added_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(key.source.as_str())
        .bind(&key.sid)
        .bind(slot)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let added = result.rows_affected() > 0;
        if added {
            Self::touch(&mut tx, id, now).await?;
        }
        tx.commit().await?;

        Ok(added)
    }

    /// Remove a track; false when it was not in the playlist
    pub async fn remove_track(pool: &SqlitePool, id: i64, key: &TrackKey) -> Result<bool> {
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "DELETE FROM playlist_track WHERE playlist_id = ? AND source = ? AND sid = ?",
        )
        .bind(id)
        .bind(key.source.as_str())
        .bind(&key.sid)
        .execute(&mut *tx)
        .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            Self::touch(&mut tx, id, Utc::now().timestamp_millis()).await?;
        }
        tx.commit().await?;

        Ok(removed)
    }

    /// Keys of a playlist's tracks in order
    pub async fn track_keys(pool: &SqlitePool, id: i64) -> Result<Vec<TrackKey>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT source, sid FROM playlist_track WHERE playlist_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(source, sid)| Some(TrackKey::new(source.parse().ok()?, sid)))
            .collect())
    }

    /// Replace the playlist order with `keys`; entries not listed are dropped
    pub async fn reorder(pool: &SqlitePool, id: i64, keys: &[TrackKey]) -> Result<()> {
        let mut tx = pool.begin().await?;

        let current: Vec<(String, String)> =
            sqlx::query_as("SELECT source, sid FROM playlist_track WHERE playlist_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        for (source, sid) in current {
            let listed = keys
                .iter()
                .any(|key| key.source.as_str() == source && key.sid == sid);
            if !listed {
                sqlx::query(
                    "DELETE FROM playlist_track WHERE playlist_id = ? AND source = ? AND sid = ?",
                )
                .bind(id)
                .bind(&source)
                .bind(&sid)
                .execute(&mut *tx)
                .await?;
            }
        }

        for (position, key) in keys.iter().enumerate() {
            sqlx::query(
                "UPDATE playlist_track SET position = ?
                 WHERE playlist_id = ? AND source = ? AND sid = ?",
            )
            .bind(position as i64)
            .bind(id)
            .bind(key.source.as_str())
            .bind(&key.sid)
            .execute(&mut *tx)
            .await?;
        }

        Self::touch(&mut tx, id, Utc::now().timestamp_millis()).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn touch(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        id: i64,
        now: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE playlist SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::engine::testing::temp_engine;
    use crate::db::TrackTable;
    use crate::models::{Source, Track};

    fn track(sid: &str, duration: u32) -> Track {
        Track::new(Source::Youtube, sid, &format!("Song {}", sid), "Band", "")
            .with_duration(Some(duration))
    }

    fn sids(playlist: &Playlist) -> Vec<&str> {
        playlist.tracks.iter().map(|e| e.track.sid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_insert_get_and_ownership() {
        let (engine, _dir) = temp_engine().await;
        let pool = engine.pool();

        let id = PlaylistTable::insert(pool, "s1", "Road trip", "", false).await.unwrap();
        let playlist = PlaylistTable::get(pool, "s1", id).await.unwrap().unwrap();
        assert_eq!(playlist.name, "Road trip");
        assert_eq!(playlist.track_count, 0);

        assert!(PlaylistTable::get(pool, "s2", id).await.unwrap().is_none());
        assert!(PlaylistTable::name_exists(pool, "s1", "Road trip", None).await.unwrap());
        assert!(!PlaylistTable::name_exists(pool, "s1", "Road trip", Some(id)).await.unwrap());
        assert!(!PlaylistTable::name_exists(pool, "s2", "Road trip", None).await.unwrap());

        // unique per session
        assert!(PlaylistTable::insert(pool, "s1", "Road trip", "", false).await.is_err());
        assert!(PlaylistTable::insert(pool, "s2", "Road trip", "", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_add_positions_and_totals() {
        let (engine, _dir) = temp_engine().await;
        let pool = engine.pool();
        let (a, b, c) = (track("a", 100), track("b", 200), track("c", 300));
        TrackTable::upsert_many(pool, [&a, &b, &c]).await.unwrap();
        let id = PlaylistTable::insert(pool, "s1", "Mix", "", false).await.unwrap();

        assert!(PlaylistTable::add_track(pool, id, &a.key(), PlaylistPosition::End).await.unwrap());
        assert!(PlaylistTable::add_track(pool, id, &b.key(), PlaylistPosition::End).await.unwrap());
        assert!(PlaylistTable::add_track(pool, id, &c.key(), PlaylistPosition::Start).await.unwrap());
        assert!(!PlaylistTable::add_track(pool, id, &a.key(), PlaylistPosition::Start).await.unwrap());

        let playlist = PlaylistTable::get(pool, "s1", id).await.unwrap().unwrap();
        assert_eq!(sids(&playlist), ["c", "a", "b"]);
        assert_eq!(playlist.track_count, 3);
        assert_eq!(playlist.total_duration, 600);

        assert!(PlaylistTable::remove_track(pool, id, &a.key()).await.unwrap());
        assert!(!PlaylistTable::remove_track(pool, id, &a.key()).await.unwrap());
        let keys = PlaylistTable::track_keys(pool, id).await.unwrap();
        assert_eq!(keys, vec![c.key(), b.key()]);
    }

    #[tokio::test]
    async fn test_reorder_drops_unlisted() {
        let (engine, _dir) = temp_engine().await;
        let pool = engine.pool();
        let (a, b, c) = (track("a", 1), track("b", 1), track("c", 1));
        TrackTable::upsert_many(pool, [&a, &b, &c]).await.unwrap();
        let id = PlaylistTable::insert(pool, "s1", "Mix", "", false).await.unwrap();
        for t in [&a, &b] {
            PlaylistTable::add_track(pool, id, &t.key(), PlaylistPosition::End).await.unwrap();
        }
        // a start insert leaves a negative position behind
        PlaylistTable::add_track(pool, id, &c.key(), PlaylistPosition::Start).await.unwrap();

        PlaylistTable::reorder(pool, id, &[c.key(), a.key()]).await.unwrap();
        let playlist = PlaylistTable::get(pool, "s1", id).await.unwrap().unwrap();
        assert_eq!(sids(&playlist), ["c", "a"]);

        // appending after a reorder still lands last
        PlaylistTable::add_track(pool, id, &b.key(), PlaylistPosition::End).await.unwrap();
        let playlist = PlaylistTable::get(pool, "s1", id).await.unwrap().unwrap();
        assert_eq!(sids(&playlist), ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_update_delete_and_listing_order() {
        let (engine, _dir) = temp_engine().await;
        let pool = engine.pool();
        let a = track("a", 10);
        TrackTable::upsert(pool, &a).await.unwrap();

        let first = PlaylistTable::insert(pool, "s1", "First", "", false).await.unwrap();
        let second = PlaylistTable::insert(pool, "s1", "Second", "", false).await.unwrap();
        PlaylistTable::add_track(pool, first, &a.key(), PlaylistPosition::End).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let changes = PlaylistChanges {
            description: Some("Updated".to_string()),
            is_public: Some(true),
            ..Default::default()
        };
        assert!(PlaylistTable::update(pool, "s1", first, &changes).await.unwrap());
        assert!(!PlaylistTable::update(pool, "s2", first, &changes).await.unwrap());

        let all = PlaylistTable::all(pool, "s1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first);
        assert_eq!(all[0].name, "First");
        assert_eq!(all[0].description, "Updated");
        assert!(all[0].is_public);
        assert_eq!(all[0].track_count, 1);
        assert_eq!(all[1].id, second);

        assert!(PlaylistTable::delete(pool, "s1", first).await.unwrap());
        assert!(PlaylistTable::track_keys(pool, first).await.unwrap().is_empty());
        assert_eq!(PlaylistTable::all(pool, "s1").await.unwrap().len(), 1);
    }
}
