//! Database engine and connection management

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Database engine wrapper; clones share the pool
#[derive(Clone)]
pub struct DbEngine {
    pool: SqlitePool,
}

impl DbEngine {
    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Open (creating if needed) the SQLite database at `db_path` and make sure
/// every table exists
pub async fn setup_sqlite(db_path: &Path) -> Result<DbEngine> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
        .pragma("foreign_keys", "ON");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    let engine = DbEngine { pool };
    create_tables(engine.pool()).await?;
    info!("Database ready at {}", db_path.display());

    Ok(engine)
}

/// Create all database tables
async fn create_tables(pool: &SqlitePool) -> Result<()> {
    // Tracks seen through search or play, keyed by identity
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS track (
            source TEXT NOT NULL,
            sid TEXT NOT NULL,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT,
            thumbnail_url TEXT,
            duration INTEGER,
            url TEXT NOT NULL,
            stream_url TEXT,
            explicit INTEGER NOT NULL DEFAULT 0,
            metadata TEXT NOT NULL DEFAULT '{}',
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (source, sid)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            source TEXT NOT NULL,
            sid TEXT NOT NULL,
            played_at INTEGER NOT NULL,
            FOREIGN KEY (source, sid) REFERENCES track(source, sid) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_history_session ON history(session_id, played_at);
        CREATE INDEX IF NOT EXISTS idx_history_track ON history(source, sid);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS preferences (
            session_id TEXT PRIMARY KEY,
            volume REAL NOT NULL,
            repeat_mode TEXT NOT NULL,
            shuffle INTEGER NOT NULL,
            autoplay INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorite (
            session_id TEXT NOT NULL,
            source TEXT NOT NULL,
            sid TEXT NOT NULL,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (session_id, source, sid),
            FOREIGN KEY (source, sid) REFERENCES track(source, sid) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_favorite_session ON favorite(session_id, added_at);
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            cover_url TEXT,
            is_public INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (session_id, name)
        );

        CREATE TABLE IF NOT EXISTS playlist_track (
            playlist_id INTEGER NOT NULL,
            source TEXT NOT NULL,
            sid TEXT NOT NULL,
            position INTEGER NOT NULL,
            added_at INTEGER NOT NULL,
            PRIMARY KEY (playlist_id, source, sid),
            FOREIGN KEY (playlist_id) REFERENCES playlist(id) ON DELETE CASCADE,
            FOREIGN KEY (source, sid) REFERENCES track(source, sid) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_playlist_track_order ON playlist_track(playlist_id, position);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
