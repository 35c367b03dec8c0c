//! Internet radio adapter
//!
//! Stations come from a fixed list (`stations.json` in the config dir, or
//! the built-in defaults). A station's sid is its base64 encoded stream url.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use super::{SourceAdapter, SourceError, SourceResult};
use crate::models::{decode_station_id, default_stations, Playable, RadioStation, Source, Track};
use crate::utils::network::stream_reachable;

/// Read the station list, falling back to the defaults when the file is
/// missing or unreadable
pub fn load_stations(path: &Path) -> Vec<RadioStation> {
    if !path.exists() {
        return default_stations();
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str::<Vec<RadioStation>>(&raw).map_err(Into::into));

    match parsed {
        Ok(stations) => {
            info!("Loaded {} radio stations from {}", stations.len(), path.display());
            stations
        }
        Err(e) => {
            warn!("Could not read {}: {}; using default stations", path.display(), e);
            default_stations()
        }
    }
}

pub struct RadioSource {
    client: Client,
    stations: Vec<RadioStation>,
    stream_check_timeout: Duration,
}

impl RadioSource {
    pub fn new(client: Client, stations: Vec<RadioStation>, stream_check_timeout: Duration) -> Self {
        Self {
            client,
            stations,
            stream_check_timeout,
        }
    }

    pub fn stations(&self) -> &[RadioStation] {
        &self.stations
    }

    /// Stations matching a free-text query; a blank query returns all
    pub fn search_stations(&self, query: &str) -> Vec<&RadioStation> {
        self.stations.iter().filter(|s| s.matches(query)).collect()
    }

    pub fn by_genre(&self, genre: &str) -> Vec<&RadioStation> {
        self.stations
            .iter()
            .filter(|s| s.genre.eq_ignore_ascii_case(genre))
            .collect()
    }

    pub fn by_country(&self, country: &str) -> Vec<&RadioStation> {
        self.stations
            .iter()
            .filter(|s| s.country.eq_ignore_ascii_case(country))
            .collect()
    }

    /// Distinct genres, sorted
    pub fn genres(&self) -> Vec<String> {
        self.stations
            .iter()
            .map(|s| s.genre.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn station(&self, sid: &str) -> Option<&RadioStation> {
        let url = decode_station_id(sid)?;
        self.stations.iter().find(|s| s.url == url)
    }
}

#[async_trait]
impl SourceAdapter for RadioSource {
    fn source(&self) -> Source {
        Source::Radio
    }

    async fn try_search(&self, query: &str, limit: usize) -> SourceResult<Vec<Track>> {
        Ok(self
            .search_stations(query)
            .into_iter()
            .take(limit)
            .map(RadioStation::to_track)
            .collect())
    }

    async fn resolve_playback(&self, sid: &str) -> SourceResult<Playable> {
        let url = decode_station_id(sid).ok_or_else(|| SourceError::InvalidId {
            provider: Source::Radio,
            id: sid.to_string(),
        })?;

        if !stream_reachable(&self.client, &url, self.stream_check_timeout).await {
            return Err(SourceError::StationUnreachable(url));
        }

        Ok(Playable::Direct {
            stream_url: url,
            expires_at: None,
            is_live: true,
        })
    }
}
