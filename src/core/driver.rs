//! Playback Driver
//!
//! Binds the queue to a media sink. When the current track changes it
//! resolves the track and either loads a stream or surfaces an "open in"
//! notice. Resolution is split in two halves so the lock on a session can
//! be released while the network call runs; a ticket ties the late result
//! back to the track it was issued for, and results for anything but the
//! current track are dropped.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::queue::{IgnoreReason, Outcome, QueueStore};
use super::resolver::Resolve;
use crate::models::{Playable, RepeatMode, Track, TrackKey};

/// Receives "track started" events. Must not block.
pub trait HistoryRecorder: Send + Sync {
    fn record(&self, track: &Track);
}

/// Something the UI should show next to the player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlaybackNotice {
    /// Nothing streamable; offer a link instead
    External { url: String, message: String },
    /// The media element gave up; the user can retry or skip
    Error { message: String },
}

/// Pending resolution for one specific track change
#[derive(Debug, Clone)]
pub struct ResolutionTicket {
    key: TrackKey,
    generation: u64,
    track: Track,
}

impl ResolutionTicket {
    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn key(&self) -> &TrackKey {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    Applied(Playable),
    /// The queue moved on while the resolution was in flight
    Discarded,
}

pub struct PlaybackDriver<R: Resolve> {
    store: QueueStore,
    resolver: Arc<R>,
    history: Option<Arc<dyn HistoryRecorder>>,
    notice: Option<PlaybackNotice>,
    playable: Option<Playable>,
}

impl<R: Resolve> PlaybackDriver<R> {
    pub fn new(store: QueueStore, resolver: Arc<R>) -> Self {
        Self {
            store,
            resolver,
            history: None,
            notice: None,
            playable: None,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryRecorder>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut QueueStore {
        &mut self.store
    }

    pub fn resolver(&self) -> Arc<R> {
        self.resolver.clone()
    }

    pub fn notice(&self) -> Option<&PlaybackNotice> {
        self.notice.as_ref()
    }

    /// The resolution applied to the current track, once known
    pub fn playable(&self) -> Option<&Playable> {
        self.playable.as_ref()
    }

    /// Start resolving the current track if it changed since the last call
    pub fn begin_resolution(&mut self) -> Option<ResolutionTicket> {
        let change = self.store.take_track_change()?;
        self.notice = None;
        self.playable = None;

        let Some(track) = change.track else {
            debug!("Queue emptied, nothing to resolve");
            return None;
        };

        Some(ResolutionTicket {
            key: track.key(),
            generation: change.generation,
            track,
        })
    }

    /// Apply a finished resolution if its track is still current
    pub fn complete_resolution(
        &mut self,
        ticket: ResolutionTicket,
        playable: Playable,
    ) -> ApplyResult {
        let still_current = ticket.generation == self.store.generation()
            && self.store.current().map(|t| t.is(&ticket.key)).unwrap_or(false);
        if !still_current {
            debug!("Discarding stale resolution for {}", ticket.key);
            return ApplyResult::Discarded;
        }

        self.store.set_loading(false);

        match &playable {
            Playable::Direct { stream_url, .. } | Playable::Preview { stream_url, .. } => {
                let start = self.store.is_playing() || self.store.autoplay();
                let sink = self.store.sink_mut();
                sink.set_source(stream_url);
                if start {
                    sink.play();
                    self.store.mark_playing();
                    if let Some(history) = &self.history {
                        history.record(&ticket.track);
                    }
                }
            }
            Playable::External {
                external_url,
                message,
            } => {
                self.store.suppress_playback();
                self.notice = Some(PlaybackNotice::External {
                    url: external_url.clone(),
                    message: message.clone(),
                });
            }
        }

        self.playable = Some(playable.clone());
        ApplyResult::Applied(playable)
    }

    /// Resolve and apply in one go, holding `self` across the await
    pub async fn sync(&mut self) -> Option<ApplyResult> {
        let ticket = self.begin_resolution()?;
        let playable = self.resolver.resolve(ticket.track()).await;
        Some(self.complete_resolution(ticket, playable))
    }

    pub fn on_time_update(&mut self, time: f64) -> Outcome {
        self.store.set_current_time(time)
    }

    pub fn on_duration_known(&mut self, duration: f64) -> Outcome {
        self.store.set_duration(duration)
    }

    /// The media element finished the track
    pub fn on_ended(&mut self) -> Outcome {
        if self.store.current().is_none() {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        }

        if self.store.repeat_mode() == RepeatMode::One {
            return self.restart_current();
        }

        match self.store.next() {
            // shuffling a single track lands back on it
            Outcome::Ignored(IgnoreReason::NoOtherTrack) => self.restart_current(),
            outcome @ Outcome::Ignored(_) => {
                self.store.stop();
                outcome
            }
            outcome => outcome,
        }
    }

    /// Replay the loaded source from the top without resolving again
    fn restart_current(&mut self) -> Outcome {
        self.store.set_current_time(0.0);
        let sink = self.store.sink_mut();
        sink.seek(0.0);
        sink.play();
        self.store.mark_playing();
        Outcome::Applied
    }

    /// Unrecoverable media error; the queue position stays put
    pub fn on_error(&mut self, message: &str) -> Outcome {
        warn!("Media error on {:?}: {}", self.store.current().map(Track::key), message);
        self.store.set_loading(false);
        self.store.suppress_playback();
        self.notice = Some(PlaybackNotice::Error {
            message: message.to_string(),
        });
        Outcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::HeadlessSink;
    use crate::models::Source;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Resolver answering from a fixed table
    struct Scripted(HashMap<String, Playable>);

    #[async_trait]
    impl Resolve for Scripted {
        async fn resolve(&self, track: &Track) -> Playable {
            self.0
                .get(&track.sid)
                .cloned()
                .unwrap_or_else(|| Playable::external(track.fallback_url(), "unknown"))
        }
    }

    #[derive(Default)]
    struct Played(Mutex<Vec<String>>);

    impl HistoryRecorder for Played {
        fn record(&self, track: &Track) {
            self.0.lock().push(track.sid.clone());
        }
    }

    fn direct(url: &str) -> Playable {
        Playable::Direct {
            stream_url: url.to_string(),
            expires_at: None,
            is_live: false,
        }
    }

    fn track(id: &str) -> Track {
        Track::new(Source::Deezer, id, id, "Band", format!("https://deezer.test/{}", id))
    }

    fn driver() -> (PlaybackDriver<Scripted>, HeadlessSink, Arc<Played>) {
        let sink = HeadlessSink::new();
        let resolver = Scripted(HashMap::from([
            ("a".to_string(), direct("https://cdn.test/a.mp3")),
            ("b".to_string(), direct("https://cdn.test/b.mp3")),
            (
                "x".to_string(),
                Playable::external("https://deezer.test/x", "Full track available on Deezer"),
            ),
        ]));
        let played = Arc::new(Played::default());
        let driver = PlaybackDriver::new(
            QueueStore::new(Box::new(sink.clone())).with_seed(1),
            Arc::new(resolver),
        )
        .with_history(played.clone());
        (driver, sink, played)
    }

    #[tokio::test]
    async fn test_direct_loads_and_autoplays() {
        let (mut d, sink, played) = driver();
        d.store_mut().set_queue(vec![track("a"), track("b")], 0);

        let result = d.sync().await;
        assert_eq!(result, Some(ApplyResult::Applied(direct("https://cdn.test/a.mp3"))));
        assert_eq!(sink.state().source.as_deref(), Some("https://cdn.test/a.mp3"));
        assert!(sink.state().playing);
        assert!(d.store().is_playing());
        assert!(!d.store().is_loading());
        assert_eq!(*played.0.lock(), vec!["a".to_string()]);

        // nothing changed, nothing to do
        assert_eq!(d.sync().await, None);
    }

    #[tokio::test]
    async fn test_no_autoplay_loads_without_playing() {
        let (mut d, sink, played) = driver();
        d.store_mut().set_autoplay(false);
        d.store_mut().set_queue(vec![track("a")], 0);
        d.sync().await;
        assert_eq!(sink.state().source.as_deref(), Some("https://cdn.test/a.mp3"));
        assert!(!sink.state().playing);
        assert!(played.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_external_suppresses_playback() {
        let (mut d, sink, _) = driver();
        d.store_mut().set_queue(vec![track("a"), track("x")], 0);
        d.sync().await;
        assert!(sink.state().playing);

        d.store_mut().next();
        d.sync().await;
        assert_eq!(sink.state().source, None);
        assert!(!d.store().is_playing());
        assert_eq!(
            d.notice(),
            Some(&PlaybackNotice::External {
                url: "https://deezer.test/x".to_string(),
                message: "Full track available on Deezer".to_string(),
            })
        );

        // nothing to start until the track changes again
        assert_eq!(d.store_mut().play(), Outcome::Ignored(IgnoreReason::NothingLoaded));
        assert_eq!(d.store_mut().toggle_play(), Outcome::Ignored(IgnoreReason::NothingLoaded));
        assert!(!d.store().is_playing());
        assert!(!sink.state().playing);

        d.store_mut().previous();
        d.sync().await;
        assert!(d.store().is_playing());
        assert!(d.store_mut().pause().is_applied());
        assert!(d.store_mut().play().is_applied());
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let (mut d, sink, _) = driver();
        d.store_mut().set_queue(vec![track("a"), track("b")], 0);
        let stale = d.begin_resolution().unwrap();
        assert_eq!(stale.key(), &track("a").key());

        // user picks b before a's resolution arrives
        d.store_mut().set_current_index(1);
        let fresh = d.begin_resolution().unwrap();

        let late = d.resolver().resolve(stale.track()).await;
        assert_eq!(d.complete_resolution(stale, late), ApplyResult::Discarded);
        assert_eq!(sink.state().source, None);

        let playable = d.resolver().resolve(fresh.track()).await;
        assert!(matches!(
            d.complete_resolution(fresh, playable),
            ApplyResult::Applied(_)
        ));
        assert_eq!(sink.state().source.as_deref(), Some("https://cdn.test/b.mp3"));
    }

    #[tokio::test]
    async fn test_same_track_reselected_invalidates_older_ticket() {
        let (mut d, _, _) = driver();
        d.store_mut().set_queue(vec![track("a")], 0);
        let first = d.begin_resolution().unwrap();
        d.store_mut().set_current_index(0);
        let _second = d.begin_resolution().unwrap();
        assert_eq!(
            d.complete_resolution(first, direct("https://cdn.test/a.mp3")),
            ApplyResult::Discarded
        );
    }

    #[tokio::test]
    async fn test_ended_repeat_one_restarts() {
        let (mut d, sink, _) = driver();
        d.store_mut().set_queue(vec![track("a"), track("b")], 0);
        d.sync().await;
        d.store_mut().set_duration(180.0);
        d.on_time_update(179.5);
        d.store_mut().set_repeat_mode(RepeatMode::One);

        assert!(d.on_ended().is_applied());
        assert_eq!(d.store().current_index(), Some(0));
        assert_eq!(d.store().current_time(), 0.0);
        assert_eq!(sink.state().position, 0.0);
        assert!(sink.state().playing);
        // restarting does not need a new resolution
        assert_eq!(sink.state().loads, 1);
        assert!(d.begin_resolution().is_none());
    }

    #[tokio::test]
    async fn test_ended_advances_then_stops_at_end() {
        let (mut d, sink, played) = driver();
        d.store_mut().set_queue(vec![track("a"), track("b")], 0);
        d.sync().await;

        assert!(d.on_ended().is_applied());
        d.sync().await;
        assert_eq!(d.store().current_index(), Some(1));
        assert_eq!(sink.state().source.as_deref(), Some("https://cdn.test/b.mp3"));

        assert_eq!(d.on_ended(), Outcome::Ignored(IgnoreReason::EndOfQueue));
        assert!(!d.store().is_playing());
        assert_eq!(d.store().current_index(), Some(1));
        assert_eq!(*played.0.lock(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_ended_single_track_shuffle_replays() {
        let (mut d, sink, _) = driver();
        d.store_mut().set_queue(vec![track("a")], 0);
        d.sync().await;
        d.store_mut().set_shuffle(true);
        d.on_time_update(42.0);

        assert!(d.on_ended().is_applied());
        assert_eq!(d.store().current_index(), Some(0));
        assert_eq!(d.store().current_time(), 0.0);
        assert!(d.store().is_playing());
        assert!(sink.state().playing);
        assert_eq!(sink.state().position, 0.0);
        assert!(d.begin_resolution().is_none());
    }

    #[tokio::test]
    async fn test_error_keeps_position() {
        let (mut d, _, _) = driver();
        d.store_mut().set_queue(vec![track("a"), track("b")], 1);
        d.sync().await;

        d.on_error("MEDIA_ERR_DECODE");
        assert_eq!(d.store().current_index(), Some(1));
        assert!(!d.store().is_playing());
        assert!(matches!(d.notice(), Some(PlaybackNotice::Error { .. })));

        // skipping clears the notice
        d.store_mut().previous();
        d.sync().await;
        assert!(d.notice().is_none());
    }
}
