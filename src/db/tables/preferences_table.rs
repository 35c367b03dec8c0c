//! Player preferences table operations

use anyhow::Result;
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};

use crate::models::PlayerPreferences;

#[derive(Debug, FromRow)]
struct PreferencesRow {
    volume: f64,
    repeat_mode: String,
    shuffle: bool,
    autoplay: bool,
}

impl PreferencesRow {
    fn into_preferences(self) -> PlayerPreferences {
        PlayerPreferences {
            volume: self.volume as f32,
            repeat_mode: self.repeat_mode.parse().unwrap_or_default(),
            shuffle: self.shuffle,
            autoplay: self.autoplay,
        }
        .sanitized()
    }
}

/// Preferences table operations
pub struct PreferencesTable;

impl PreferencesTable {
    pub async fn get(pool: &SqlitePool, session_id: &str) -> Result<Option<PlayerPreferences>> {
        let row: Option<PreferencesRow> = sqlx::query_as(
            "SELECT volume, repeat_mode, shuffle, autoplay FROM preferences WHERE session_id = ?",
        )
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(PreferencesRow::into_preferences))
    }

    pub async fn upsert(
        pool: &SqlitePool,
        session_id: &str,
        prefs: &PlayerPreferences,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO preferences (session_id, volume, repeat_mode, shuffle, autoplay, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                volume = excluded.volume,
                repeat_mode = excluded.repeat_mode,
                shuffle = excluded.shuffle,
                autoplay = excluded.autoplay,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_id)
        .bind(f64::from(prefs.volume))
        .bind(prefs.repeat_mode.as_str())
        .bind(prefs.shuffle)
        .bind(prefs.autoplay)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;

        Ok(())
    }
}
