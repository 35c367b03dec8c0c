//! Playback resolution
//!
//! Turns a `Track` into a `Playable` by dispatching to its source adapter.
//! `resolve` never fails: any adapter error becomes an external link.

use async_trait::async_trait;
use tracing::warn;

use crate::models::{Playable, Source, Track};
use crate::sources::{SourceError, SourceRegistry, SourceResult};

/// Anything that can decide how a track should be played
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, track: &Track) -> Playable;
}

#[derive(Clone)]
pub struct PlaybackResolver {
    registry: SourceRegistry,
}

impl PlaybackResolver {
    pub fn new(registry: SourceRegistry) -> Self {
        Self { registry }
    }

    /// Resolve without the fallback, surfacing adapter errors
    pub async fn resolve_strict(&self, track: &Track) -> SourceResult<Playable> {
        let adapter = self
            .registry
            .get(track.source)
            .ok_or(SourceError::Unavailable(track.source))?;
        adapter.resolve_playback(&track.sid).await
    }

    /// The link offered when a track could not be resolved
    pub fn fallback(track: &Track) -> Playable {
        let message = match track.source {
            Source::Radio => "Station unreachable - opens in radio".to_string(),
            source => format!("Unable to stream - opens in {}", source),
        };
        Playable::external(track.fallback_url(), message)
    }
}

#[async_trait]
impl Resolve for PlaybackResolver {
    async fn resolve(&self, track: &Track) -> Playable {
        match self.resolve_strict(track).await {
            Ok(playable) => playable,
            Err(e) => {
                warn!("Could not resolve {}: {}", track.key(), e);
                Self::fallback(track)
            }
        }
    }
}
