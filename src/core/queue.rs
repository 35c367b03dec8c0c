//! Queue Store
//!
//! Owns the play queue, the current position and the playback flags, and
//! drives an injected `MediaSink`. Mutations never fail: out-of-range or
//! pointless requests come back as `Outcome::Ignored` with a reason.
//!
//! Invariant after every operation: `current` is `None` iff the queue is
//! empty, and then nothing is playing.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

use super::sink::MediaSink;
use crate::models::{PlayerPreferences, QueuePosition, RepeatMode, Track};
use crate::utils::text::matches_all_terms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IgnoreReason {
    EmptyQueue,
    IndexOutOfRange,
    EndOfQueue,
    /// Shuffle navigation with a single track
    NoOtherTrack,
    NoChange,
    UnknownDuration,
    InvalidValue,
    /// The current track resolved to nothing the sink can play
    NothingLoaded,
}

impl IgnoreReason {
    pub fn message(&self) -> &'static str {
        match self {
            IgnoreReason::EmptyQueue => "Queue is empty",
            IgnoreReason::IndexOutOfRange => "Invalid index",
            IgnoreReason::EndOfQueue => "Reached the end of the queue",
            IgnoreReason::NoOtherTrack => "No other track to move to",
            IgnoreReason::NoChange => "Nothing to change",
            IgnoreReason::UnknownDuration => "Track duration is not known yet",
            IgnoreReason::InvalidValue => "Invalid value",
            IgnoreReason::NothingLoaded => "Nothing playable is loaded for this track",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(IgnoreReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// Where player preferences go when they change. Implementations must not
/// block; saving is fire-and-forget.
pub trait PreferencesStore: Send + Sync {
    fn save(&self, prefs: &PlayerPreferences);
}

/// Emitted whenever the current track changes (or restarts)
#[derive(Debug, Clone, PartialEq)]
pub struct TrackChange {
    pub generation: u64,
    pub track: Option<Track>,
}

/// Serializable view of the player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub queue: Vec<Track>,
    pub current_index: i64,
    pub current: Option<Track>,
    pub is_playing: bool,
    pub is_paused: bool,
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub shuffle: bool,
    pub autoplay: bool,
    pub current_time: f64,
    pub duration: f64,
    pub is_loading: bool,
    pub total: usize,
}

pub struct QueueStore {
    queue: Vec<Track>,
    current: Option<usize>,
    is_playing: bool,
    is_paused: bool,
    prefs: PlayerPreferences,
    current_time: f64,
    duration: f64,
    is_loading: bool,
    /// Set once the sink source was dropped for the current track
    unplayable: bool,
    generation: u64,
    pending: Option<TrackChange>,
    sink: Box<dyn MediaSink>,
    preferences: Option<Arc<dyn PreferencesStore>>,
    rng: StdRng,
}

impl QueueStore {
    pub fn new(mut sink: Box<dyn MediaSink>) -> Self {
        let prefs = PlayerPreferences::default();
        sink.set_volume(prefs.volume);

        Self {
            queue: Vec::new(),
            current: None,
            is_playing: false,
            is_paused: false,
            prefs,
            current_time: 0.0,
            duration: 0.0,
            is_loading: false,
            unplayable: false,
            generation: 0,
            pending: None,
            sink,
            preferences: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_preferences_store(mut self, store: Arc<dyn PreferencesStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Deterministic shuffle, for tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Load persisted preferences without writing them back
    pub fn apply_preferences(&mut self, prefs: PlayerPreferences) {
        self.prefs = prefs.sanitized();
        self.sink.set_volume(self.prefs.volume);
    }

    /// Replace every preference at once and persist the result
    pub fn set_preferences(&mut self, prefs: PlayerPreferences) -> Outcome {
        self.apply_preferences(prefs);
        self.persist();
        Outcome::Applied
    }

    pub fn preferences(&self) -> PlayerPreferences {
        self.prefs
    }

    pub fn queue(&self) -> &[Track] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.queue.get(i))
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn volume(&self) -> f32 {
        self.prefs.volume
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.prefs.repeat_mode
    }

    pub fn shuffle(&self) -> bool {
        self.prefs.shuffle
    }

    pub fn autoplay(&self) -> bool {
        self.prefs.autoplay
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Counter bumped on every track change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The most recent unconsumed track change, if any
    pub fn take_track_change(&mut self) -> Option<TrackChange> {
        self.pending.take()
    }

    pub fn sink_mut(&mut self) -> &mut dyn MediaSink {
        self.sink.as_mut()
    }

    pub fn snapshot(&self) -> QueueState {
        QueueState {
            queue: self.queue.clone(),
            current_index: self.current.map(|i| i as i64).unwrap_or(-1),
            current: self.current().cloned(),
            is_playing: self.is_playing,
            is_paused: self.is_paused,
            volume: self.prefs.volume,
            repeat_mode: self.prefs.repeat_mode,
            shuffle: self.prefs.shuffle,
            autoplay: self.prefs.autoplay,
            current_time: self.current_time,
            duration: self.duration,
            is_loading: self.is_loading,
            total: self.queue.len(),
        }
    }

    fn mark_track_change(&mut self) {
        self.generation += 1;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.is_loading = self.current.is_some();
        self.unplayable = false;
        self.pending = Some(TrackChange {
            generation: self.generation,
            track: self.current().cloned(),
        });
    }

    /// Empty queue: no current track, nothing playing
    fn reset(&mut self) {
        self.queue.clear();
        self.current = None;
        self.is_playing = false;
        self.is_paused = false;
        self.sink.pause();
        self.sink.clear_source();
        self.mark_track_change();
    }

    fn persist(&self) {
        if let Some(store) = &self.preferences {
            store.save(&self.prefs);
        }
    }

    /// A random index other than the current one
    fn random_other_index(&mut self, current: usize) -> Option<usize> {
        let len = self.queue.len();
        if len < 2 {
            return None;
        }
        let pick = self.rng.gen_range(0..len - 1);
        Some(if pick >= current { pick + 1 } else { pick })
    }

    pub fn set_queue(&mut self, tracks: Vec<Track>, start_index: usize) -> Outcome {
        if tracks.is_empty() {
            self.reset();
            return Outcome::Applied;
        }
        self.current = Some(start_index.min(tracks.len() - 1));
        self.queue = tracks;
        self.mark_track_change();
        Outcome::Applied
    }

    pub fn add_to_queue(&mut self, track: Track, position: QueuePosition) -> Outcome {
        let Some(current) = self.current else {
            self.queue = vec![track];
            self.current = Some(0);
            self.mark_track_change();
            return Outcome::Applied;
        };

        match position {
            QueuePosition::End => self.queue.push(track),
            QueuePosition::Next => self.queue.insert(current + 1, track),
        }
        Outcome::Applied
    }

    pub fn remove_from_queue(&mut self, index: usize) -> Outcome {
        let Some(current) = self.current else {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        };
        if index >= self.queue.len() {
            return Outcome::Ignored(IgnoreReason::IndexOutOfRange);
        }

        self.queue.remove(index);
        if self.queue.is_empty() {
            self.reset();
        } else if index < current {
            self.current = Some(current - 1);
        } else if index == current {
            // the following track slides into place, or the last one if we
            // removed the tail
            self.current = Some(current.min(self.queue.len() - 1));
            self.mark_track_change();
        }
        Outcome::Applied
    }

    /// Move a track, keeping `current` on the same logical track
    pub fn reorder(&mut self, from: usize, to: usize) -> Outcome {
        let Some(current) = self.current else {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        };
        let len = self.queue.len();
        if from >= len || to >= len {
            return Outcome::Ignored(IgnoreReason::IndexOutOfRange);
        }
        if from == to {
            return Outcome::Ignored(IgnoreReason::NoChange);
        }

        let track = self.queue.remove(from);
        self.queue.insert(to, track);

        self.current = Some(if from == current {
            to
        } else if from < current && current <= to {
            current - 1
        } else if to <= current && current < from {
            current + 1
        } else {
            current
        });
        Outcome::Applied
    }

    pub fn clear_queue(&mut self) -> Outcome {
        self.reset();
        Outcome::Applied
    }

    pub fn set_current_index(&mut self, index: usize) -> Outcome {
        if self.queue.is_empty() {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        }
        self.current = Some(index.min(self.queue.len() - 1));
        self.mark_track_change();
        Outcome::Applied
    }

    /// Advance. Repeat-one replays; shuffle jumps to another random track;
    /// otherwise step forward, wrapping only with repeat-all.
    pub fn next(&mut self) -> Outcome {
        let Some(current) = self.current else {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        };

        let target = if self.prefs.repeat_mode == RepeatMode::One {
            current
        } else if self.prefs.shuffle {
            match self.random_other_index(current) {
                Some(i) => i,
                None => return Outcome::Ignored(IgnoreReason::NoOtherTrack),
            }
        } else if current + 1 < self.queue.len() {
            current + 1
        } else if self.prefs.repeat_mode == RepeatMode::All {
            0
        } else {
            return Outcome::Ignored(IgnoreReason::EndOfQueue);
        };

        self.current = Some(target);
        self.mark_track_change();
        Outcome::Applied
    }

    /// Step back. Unlike `next`, this always wraps from the first track to
    /// the last, whatever the repeat mode.
    pub fn previous(&mut self) -> Outcome {
        let Some(current) = self.current else {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        };

        let target = if self.prefs.shuffle {
            match self.random_other_index(current) {
                Some(i) => i,
                None => return Outcome::Ignored(IgnoreReason::NoOtherTrack),
            }
        } else if current == 0 {
            self.queue.len() - 1
        } else {
            current - 1
        };

        self.current = Some(target);
        self.mark_track_change();
        Outcome::Applied
    }

    pub fn toggle_play(&mut self) -> Outcome {
        if self.is_playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn play(&mut self) -> Outcome {
        if self.current.is_none() {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        }
        if self.unplayable {
            return Outcome::Ignored(IgnoreReason::NothingLoaded);
        }
        if self.is_playing {
            return Outcome::Ignored(IgnoreReason::NoChange);
        }
        self.is_playing = true;
        self.is_paused = false;
        self.sink.play();
        Outcome::Applied
    }

    pub fn pause(&mut self) -> Outcome {
        if !self.is_playing {
            return Outcome::Ignored(IgnoreReason::NoChange);
        }
        self.is_playing = false;
        self.is_paused = true;
        self.sink.pause();
        Outcome::Applied
    }

    pub fn stop(&mut self) -> Outcome {
        self.is_playing = false;
        self.is_paused = false;
        self.current_time = 0.0;
        self.sink.pause();
        self.sink.seek(0.0);
        Outcome::Applied
    }

    pub fn set_volume(&mut self, volume: f32) -> Outcome {
        if !volume.is_finite() {
            return Outcome::Ignored(IgnoreReason::InvalidValue);
        }
        self.prefs.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.prefs.volume);
        self.persist();
        Outcome::Applied
    }

    pub fn seek(&mut self, position: f64) -> Outcome {
        if !position.is_finite() {
            return Outcome::Ignored(IgnoreReason::InvalidValue);
        }
        if self.current.is_none() {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        }
        if self.duration <= 0.0 {
            return Outcome::Ignored(IgnoreReason::UnknownDuration);
        }
        self.current_time = position.clamp(0.0, self.duration);
        self.sink.seek(self.current_time);
        Outcome::Applied
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) -> Outcome {
        self.prefs.repeat_mode = mode;
        self.persist();
        Outcome::Applied
    }

    pub fn set_shuffle(&mut self, shuffle: bool) -> Outcome {
        self.prefs.shuffle = shuffle;
        self.persist();
        Outcome::Applied
    }

    pub fn set_autoplay(&mut self, autoplay: bool) -> Outcome {
        self.prefs.autoplay = autoplay;
        self.persist();
        Outcome::Applied
    }

    /// Physically shuffle the queue; the current track moves to the front
    /// and keeps playing
    pub fn shuffle_queue(&mut self) -> Outcome {
        let Some(current) = self.current else {
            return Outcome::Ignored(IgnoreReason::EmptyQueue);
        };
        if self.queue.len() < 2 {
            return Outcome::Ignored(IgnoreReason::NoOtherTrack);
        }

        let playing = self.queue.remove(current);
        self.queue.shuffle(&mut self.rng);
        self.queue.insert(0, playing);
        self.current = Some(0);
        Outcome::Applied
    }

    /// Position reported by the media element
    pub fn set_current_time(&mut self, time: f64) -> Outcome {
        if !time.is_finite() {
            return Outcome::Ignored(IgnoreReason::InvalidValue);
        }
        let time = time.max(0.0);
        self.current_time = if self.duration > 0.0 {
            time.min(self.duration)
        } else {
            time
        };
        Outcome::Applied
    }

    /// Duration reported by the media element once metadata loads
    pub fn set_duration(&mut self, duration: f64) -> Outcome {
        if !duration.is_finite() || duration < 0.0 {
            return Outcome::Ignored(IgnoreReason::InvalidValue);
        }
        self.duration = duration;
        Outcome::Applied
    }

    /// Tracks whose title, artist or album contain every query term,
    /// ignoring case and accents
    pub fn find(&self, query: &str) -> Vec<(usize, &Track)> {
        self.queue
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                matches_all_terms(
                    query,
                    &[
                        t.title.as_str(),
                        t.artist.as_str(),
                        t.album.as_deref().unwrap_or_default(),
                    ],
                )
            })
            .collect()
    }

    /// Playback was suppressed (nothing streamable for the current track)
    pub(crate) fn suppress_playback(&mut self) {
        self.unplayable = true;
        self.is_playing = false;
        self.is_paused = false;
        self.sink.pause();
        self.sink.clear_source();
    }

    /// Mark playing without touching the sink; used once the driver has
    /// loaded a source and started it
    pub(crate) fn mark_playing(&mut self) {
        self.is_playing = true;
        self.is_paused = false;
    }
}
