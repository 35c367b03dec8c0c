//! Music source adapters
//!
//! One adapter per provider. Each turns provider payloads into normalized
//! `Track`s and maps the provider's licensing rules onto a `Playable`.
//! Searches fail soft: upstream trouble is logged and yields no results.

pub mod deezer;
pub mod radio;
pub mod soundcloud;
pub mod spotify;
pub mod youtube;

pub use deezer::DeezerSource;
pub use radio::{load_stations, RadioSource};
pub use soundcloud::SoundcloudSource;
pub use spotify::SpotifySource;
pub use youtube::YoutubeSource;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::{Playable, RadioStation, Source, Track};
use crate::utils::network::build_client;

/// Errors raised inside an adapter before they are absorbed at its boundary
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} credentials not configured")]
    MissingCredentials(Source),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error: {status}")]
    Status { provider: Source, status: u16 },

    #[error("{0} quota exceeded or credentials rejected")]
    QuotaExceeded(Source),

    #[error("{provider} item not found: {id}")]
    NotFound { provider: Source, id: String },

    #[error("invalid {provider} id: {id}")]
    InvalidId { provider: Source, id: String },

    #[error("unexpected {provider} payload: {message}")]
    Decode { provider: Source, message: String },

    #[error("radio station is not accessible: {0}")]
    StationUnreachable(String),

    #[error("no adapter registered for {0}")]
    Unavailable(Source),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Contract every provider adapter implements
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The source tag this adapter produces
    fn source(&self) -> Source;

    /// Search, surfacing upstream errors
    async fn try_search(&self, query: &str, limit: usize) -> SourceResult<Vec<Track>>;

    /// Map provider streaming constraints onto a `Playable`
    async fn resolve_playback(&self, sid: &str) -> SourceResult<Playable>;

    /// Search that never fails; errors are logged for operators
    async fn search(&self, query: &str, limit: usize) -> Vec<Track> {
        match self.try_search(query, limit).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("{} search failed, returning no results: {}", self.source(), e);
                Vec::new()
            }
        }
    }
}

/// Turn non-success responses into typed errors
pub(crate) fn ensure_success(resp: Response, provider: Source) -> SourceResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            Err(SourceError::QuotaExceeded(provider))
        }
        StatusCode::NOT_FOUND => Err(SourceError::NotFound {
            provider,
            id: resp
                .url()
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| resp.url().to_string()),
        }),
        _ => Err(SourceError::Status {
            provider,
            status: status.as_u16(),
        }),
    }
}

/// Log and swallow an error from a list-style call
pub(crate) fn or_empty(provider: Source, what: &str, result: SourceResult<Vec<Track>>) -> Vec<Track> {
    result.unwrap_or_else(|e| {
        warn!("{} {} failed: {}", provider, what, e);
        Vec::new()
    })
}

/// Lookup of adapters by source tag
#[derive(Clone, Default)]
pub struct SourceRegistry {
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the source it reports
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.source(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&source).cloned()
    }

    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.adapters.keys().copied().collect();
        sources.sort();
        sources
    }
}

/// Concrete adapters, kept typed for the provider-specific extras
/// (charts, trending, station listings)
#[derive(Clone)]
pub struct Providers {
    pub youtube: Arc<YoutubeSource>,
    pub ytmusic: Arc<YoutubeSource>,
    pub soundcloud: Arc<SoundcloudSource>,
    pub spotify: Arc<SpotifySource>,
    pub deezer: Arc<DeezerSource>,
    pub radio: Arc<RadioSource>,
}

impl Providers {
    pub fn from_config(config: &AppConfig, stations: Vec<RadioStation>) -> anyhow::Result<Self> {
        let client = build_client(config.http_timeout())?;

        Ok(Self {
            youtube: Arc::new(YoutubeSource::new(
                client.clone(),
                config.youtube_api_key.clone(),
            )),
            ytmusic: Arc::new(YoutubeSource::music(
                client.clone(),
                config.youtube_api_key.clone(),
            )),
            soundcloud: Arc::new(SoundcloudSource::new(
                client.clone(),
                config.soundcloud_client_id.clone(),
                config.stream_check_timeout(),
            )),
            spotify: Arc::new(SpotifySource::new(
                client.clone(),
                config.spotify_client_id.clone(),
                config.spotify_client_secret.clone(),
                config.market.clone(),
            )),
            deezer: Arc::new(DeezerSource::new(client.clone())),
            radio: Arc::new(RadioSource::new(client, stations, config.stream_check_timeout())),
        })
    }

    pub fn registry(&self) -> SourceRegistry {
        SourceRegistry::new()
            .with(self.youtube.clone())
            .with(self.ytmusic.clone())
            .with(self.soundcloud.clone())
            .with(self.spotify.clone())
            .with(self.deezer.clone())
            .with(self.radio.clone())
    }
}
