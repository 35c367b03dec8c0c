//! Media output abstraction
//!
//! The queue and the playback driver talk to whatever actually makes sound
//! through `MediaSink`. On the server that is a `HeadlessSink` which only
//! records the state the web client's audio element has to mirror.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

pub trait MediaSink: Send {
    fn set_source(&mut self, url: &str);
    fn clear_source(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: f64);
    fn set_volume(&mut self, volume: f32);
}

/// What the media element should currently be doing
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkState {
    pub source: Option<String>,
    pub playing: bool,
    pub position: f64,
    pub volume: f32,
    /// Bumped on every `set_source`, so clients can tell a reload of the
    /// same url from no change
    pub loads: u64,
}

/// Sink with no audio device; clones share state
#[derive(Debug, Clone, Default)]
pub struct HeadlessSink {
    state: Arc<Mutex<SinkState>>,
}

impl HeadlessSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SinkState {
        self.state.lock().clone()
    }
}

impl MediaSink for HeadlessSink {
    fn set_source(&mut self, url: &str) {
        let mut state = self.state.lock();
        state.source = Some(url.to_string());
        state.position = 0.0;
        state.playing = false;
        state.loads += 1;
    }

    fn clear_source(&mut self) {
        let mut state = self.state.lock();
        state.source = None;
        state.position = 0.0;
        state.playing = false;
    }

    fn play(&mut self) {
        let mut state = self.state.lock();
        // nothing to play without a source
        state.playing = state.source.is_some();
    }

    fn pause(&mut self) {
        self.state.lock().playing = false;
    }

    fn seek(&mut self, position: f64) {
        self.state.lock().position = position.max(0.0);
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume;
    }
}
