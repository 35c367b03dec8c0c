//! Deezer adapter
//!
//! The public API needs no credentials. Only 30 second previews are
//! streamable.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ensure_success, or_empty, SourceAdapter, SourceError, SourceResult};
use crate::core::normalize::{artist_or_unknown, duration_from_secs, id_string};
use crate::models::{Playable, Source, Track};

const DEEZER_API_BASE: &str = "https://api.deezer.com";
const PREVIEW_SECONDS: u32 = 30;
const PREVIEW_MESSAGE: &str = "30-second preview - Full track available on Deezer";
const EXTERNAL_MESSAGE: &str = "Full track available on Deezer";

#[derive(Debug, Deserialize)]
struct DeezerList {
    #[serde(default)]
    data: Vec<DeezerTrack>,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: String,
    artist: Option<DeezerArtist>,
    album: Option<DeezerAlbum>,
    duration: Option<i64>,
    link: Option<String>,
    #[serde(default)]
    explicit_lyrics: bool,
    preview: Option<String>,
    rank: Option<i64>,
    bpm: Option<f64>,
    isrc: Option<String>,
    release_date: Option<String>,
    track_position: Option<u32>,
    disk_number: Option<u32>,
    /// Deezer reports lookup failures inside a 200 response
    error: Option<DeezerError>,
}

#[derive(Debug, Deserialize)]
struct DeezerArtist {
    id: Option<Value>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerAlbum {
    id: Option<Value>,
    title: Option<String>,
    cover_medium: Option<String>,
    cover_small: Option<String>,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerError {
    message: Option<String>,
}

pub struct DeezerSource {
    client: Client,
}

impl DeezerSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let resp = self
            .client
            .get(format!("{}{}", DEEZER_API_BASE, path))
            .query(query)
            .send()
            .await?;
        Ok(ensure_success(resp, Source::Deezer)?.json().await?)
    }

    async fn list(&self, path: &str, query: &[(&str, String)]) -> SourceResult<Vec<Track>> {
        let list: DeezerList = self.get(path, query).await?;
        Ok(list.data.iter().filter_map(map_track).collect())
    }

    pub async fn track_details(&self, track_id: &str) -> SourceResult<Track> {
        let raw: DeezerTrack = self.get(&format!("/track/{}", track_id), &[]).await?;
        if let Some(err) = raw.error.as_ref() {
            tracing::debug!("Deezer lookup of {} failed: {:?}", track_id, err.message);
            return Err(SourceError::NotFound {
                provider: Source::Deezer,
                id: track_id.to_string(),
            });
        }
        map_track(&raw).ok_or_else(|| SourceError::Decode {
            provider: Source::Deezer,
            message: "track without id".to_string(),
        })
    }

    pub async fn album_tracks(&self, album_id: &str) -> Vec<Track> {
        let result = self.list(&format!("/album/{}/tracks", album_id), &[]).await;
        or_empty(Source::Deezer, "album tracks", result)
    }

    pub async fn artist_top_tracks(&self, artist_id: &str, limit: usize) -> Vec<Track> {
        let result = self
            .list(
                &format!("/artist/{}/top", artist_id),
                &[("limit", limit.to_string())],
            )
            .await;
        or_empty(Source::Deezer, "artist top tracks", result)
    }

    /// Global chart, tagged with 1-based chart positions
    pub async fn charts(&self, limit: usize) -> Vec<Track> {
        let result = self
            .list("/chart/0/tracks", &[("limit", limit.to_string())])
            .await
            .map(with_chart_positions);
        or_empty(Source::Deezer, "charts", result)
    }
}

fn with_chart_positions(tracks: Vec<Track>) -> Vec<Track> {
    tracks
        .into_iter()
        .enumerate()
        .map(|(i, t)| t.with_meta("chartPosition", json!(i + 1)))
        .collect()
}

fn map_track(raw: &DeezerTrack) -> Option<Track> {
    let sid = id_string(&raw.id)?;
    let album = raw.album.as_ref();
    let artist = raw.artist.as_ref();
    let url = raw
        .link
        .clone()
        .or_else(|| Source::Deezer.canonical_url(&sid))
        .unwrap_or_default();
    let thumbnail = album.and_then(|a| a.cover_medium.clone().or_else(|| a.cover_small.clone()));
    let release_date = raw
        .release_date
        .clone()
        .or_else(|| album.and_then(|a| a.release_date.clone()));

    Some(
        Track::new(
            Source::Deezer,
            sid,
            &raw.title,
            &artist_or_unknown(artist.and_then(|a| a.name.as_deref())),
            url,
        )
        .with_album(album.and_then(|a| a.title.as_deref()))
        .with_thumbnail(thumbnail)
        .with_duration(duration_from_secs(raw.duration))
        .with_explicit(raw.explicit_lyrics)
        .with_meta("rank", json!(raw.rank))
        .with_meta("previewUrl", json!(raw.preview))
        .with_meta("albumId", json!(album.and_then(|a| a.id.clone())))
        .with_meta("artistId", json!(artist.and_then(|a| a.id.clone())))
        .with_meta("releaseDate", json!(release_date))
        .with_meta("bpm", json!(raw.bpm))
        .with_meta("isrc", json!(raw.isrc))
        .with_meta("trackPosition", json!(raw.track_position))
        .with_meta("diskNumber", json!(raw.disk_number)),
    )
}

fn playable_for(track: &Track) -> Playable {
    match track.meta_str("previewUrl") {
        Some(preview) if !preview.is_empty() => Playable::Preview {
            stream_url: preview.to_string(),
            duration: PREVIEW_SECONDS,
            message: PREVIEW_MESSAGE.to_string(),
        },
        _ => Playable::external(track.fallback_url(), EXTERNAL_MESSAGE),
    }
}

#[async_trait]
impl SourceAdapter for DeezerSource {
    fn source(&self) -> Source {
        Source::Deezer
    }

    async fn try_search(&self, query: &str, limit: usize) -> SourceResult<Vec<Track>> {
        self.list(
            "/search",
            &[("q", query.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn resolve_playback(&self, sid: &str) -> SourceResult<Playable> {
        let track = self.track_details(sid).await?;
        Ok(playable_for(&track))
    }
}
