//! Persists player preferences per session
//!
//! Saves go through one writer task per session, so they land in the order
//! they were made. A burst of saves collapses into the newest one.

use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error};

use crate::core::queue::PreferencesStore;
use crate::db::PreferencesTable;
use crate::models::PlayerPreferences;

pub struct SqlPreferencesStore {
    tx: UnboundedSender<PlayerPreferences>,
}

impl SqlPreferencesStore {
    /// Must be called inside a tokio runtime; the writer task lives until
    /// the store is dropped and every queued save is written.
    pub fn new(pool: SqlitePool, session_id: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(pool, session_id.into(), rx));
        Self { tx }
    }
}

async fn write_loop(
    pool: SqlitePool,
    session_id: String,
    mut rx: UnboundedReceiver<PlayerPreferences>,
) {
    while let Some(mut prefs) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            prefs = newer;
        }
        if let Err(e) = PreferencesTable::upsert(&pool, &session_id, &prefs).await {
            error!("Failed to save preferences for {}: {}", session_id, e);
        }
    }
    debug!("Preferences writer for {} stopped", session_id);
}

impl PreferencesStore for SqlPreferencesStore {
    fn save(&self, prefs: &PlayerPreferences) {
        if self.tx.send(*prefs).is_err() {
            error!("Preferences writer is gone, dropping save");
        }
    }
}
