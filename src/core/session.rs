//! Per-session players
//!
//! Every client session gets its own queue and playback driver, bound to a
//! `HeadlessSink` whose state the web client mirrors onto its audio element.

use dashmap::DashMap;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::driver::{PlaybackDriver, PlaybackNotice};
use super::queue::{QueueState, QueueStore};
use super::resolver::{PlaybackResolver, Resolve};
use super::sink::{HeadlessSink, SinkState};
use crate::db::PreferencesTable;
use crate::models::Playable;
use crate::stores::{SqlHistoryRecorder, SqlPreferencesStore};

pub const DEFAULT_SESSION: &str = "default";

/// Track changes resolved per `settle` call before giving up
const MAX_RESOLUTIONS: usize = 8;

pub struct Session {
    driver: PlaybackDriver<PlaybackResolver>,
    sink: HeadlessSink,
    last_seen: Instant,
}

/// Everything the client needs to render the player
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub player: QueueState,
    pub notice: Option<PlaybackNotice>,
    pub playable: Option<Playable>,
    pub media: SinkState,
}

impl Session {
    pub fn driver(&self) -> &PlaybackDriver<PlaybackResolver> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut PlaybackDriver<PlaybackResolver> {
        self.last_seen = Instant::now();
        &mut self.driver
    }

    pub fn store_mut(&mut self) -> &mut QueueStore {
        self.driver_mut().store_mut()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            player: self.driver.store().snapshot(),
            notice: self.driver.notice().cloned(),
            playable: self.driver.playable().cloned(),
            media: self.sink.state(),
        }
    }
}

/// Resolve pending track changes without holding the lock across the
/// provider call
pub async fn settle(session: &Mutex<Session>) {
    for _ in 0..MAX_RESOLUTIONS {
        let (ticket, resolver) = {
            let mut guard = session.lock().await;
            match guard.driver.begin_resolution() {
                Some(ticket) => (ticket, guard.driver.resolver()),
                None => return,
            }
        };

        let playable = resolver.resolve(ticket.track()).await;
        session.lock().await.driver.complete_resolution(ticket, playable);
    }
    warn!("Queue kept changing during resolution; leaving the rest pending");
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Arc<Mutex<Session>>>>,
    resolver: Arc<PlaybackResolver>,
    pool: Option<SqlitePool>,
}

impl SessionRegistry {
    pub fn new(resolver: PlaybackResolver, pool: Option<SqlitePool>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            resolver: Arc::new(resolver),
            pool,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Existing session, or a new one seeded with the stored preferences
    pub async fn get_or_create(&self, id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.get(id) {
            return session.value().clone();
        }

        let prefs = match &self.pool {
            Some(pool) => PreferencesTable::get(pool, id).await.unwrap_or_else(|e| {
                warn!("Failed to load preferences for {}: {}", id, e);
                None
            }),
            None => None,
        };

        let session = self.build(id, prefs);
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .value()
            .clone()
    }

    fn build(&self, id: &str, prefs: Option<crate::models::PlayerPreferences>) -> Session {
        let sink = HeadlessSink::new();
        let mut store = QueueStore::new(Box::new(sink.clone()));
        if let Some(prefs) = prefs {
            store.apply_preferences(prefs);
        }

        let mut driver = match &self.pool {
            Some(pool) => {
                store = store
                    .with_preferences_store(Arc::new(SqlPreferencesStore::new(pool.clone(), id)));
                PlaybackDriver::new(store, self.resolver.clone())
                    .with_history(Arc::new(SqlHistoryRecorder::new(pool.clone(), id)))
            }
            None => PlaybackDriver::new(store, self.resolver.clone()),
        };
        // nothing pending on a fresh session
        driver.begin_resolution();

        debug!("Created player session {}", id);
        Session {
            driver,
            sink,
            last_seen: Instant::now(),
        }
    }

    /// Drop sessions idle for longer than `max_idle`; busy ones are kept
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| match session.try_lock() {
            Ok(guard) => guard.last_seen.elapsed() < max_idle,
            Err(_) => true,
        });
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::engine::testing::temp_engine;
    use crate::models::{QueuePosition, RepeatMode, Source, Track};
    use crate::sources::SourceRegistry;

    fn registry(pool: Option<SqlitePool>) -> SessionRegistry {
        SessionRegistry::new(PlaybackResolver::new(SourceRegistry::new()), pool)
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let sessions = registry(None);
        let a = sessions.get_or_create("a").await;
        let b = sessions.get_or_create("b").await;

        a.lock().await.store_mut().add_to_queue(
            Track::new(Source::Deezer, "1", "Song", "Band", "https://deezer.test/1"),
            QueuePosition::End,
        );

        assert_eq!(a.lock().await.snapshot().player.total, 1);
        assert_eq!(b.lock().await.snapshot().player.total, 0);
        assert_eq!(sessions.len(), 2);

        let again = sessions.get_or_create("a").await;
        assert!(Arc::ptr_eq(&a, &again));
    }

    #[tokio::test]
    async fn test_settle_falls_back_without_adapters() {
        let sessions = registry(None);
        let session = sessions.get_or_create("default").await;
        session.lock().await.store_mut().set_queue(
            vec![Track::new(Source::Deezer, "1", "Song", "Band", "https://deezer.test/1")],
            0,
        );

        settle(&session).await;

        let snapshot = session.lock().await.snapshot();
        assert!(!snapshot.player.is_loading);
        assert!(matches!(
            snapshot.notice,
            Some(PlaybackNotice::External { ref url, .. }) if url == "https://deezer.test/1"
        ));
        assert_eq!(snapshot.media.source, None);
    }

    #[tokio::test]
    async fn test_new_session_loads_preferences() {
        let (engine, _dir) = temp_engine().await;
        let prefs = crate::models::PlayerPreferences {
            volume: 0.25,
            repeat_mode: RepeatMode::All,
            shuffle: true,
            autoplay: false,
        };
        PreferencesTable::upsert(engine.pool(), "s1", &prefs).await.unwrap();

        let sessions = registry(Some(engine.pool().clone()));
        let session = sessions.get_or_create("s1").await;
        let player = session.lock().await.snapshot().player;
        assert_eq!(player.volume, 0.25);
        assert_eq!(player.repeat_mode, RepeatMode::All);
        assert!(!player.autoplay);
    }

    #[tokio::test]
    async fn test_sweep_idle() {
        let sessions = registry(None);
        sessions.get_or_create("a").await;
        assert_eq!(sessions.sweep_idle(Duration::from_secs(3600)), 0);
        assert_eq!(sessions.sweep_idle(Duration::ZERO), 1);
        assert!(sessions.is_empty());
    }
}
