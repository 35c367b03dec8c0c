//! SoundCloud adapter

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::{ensure_success, or_empty, SourceAdapter, SourceError, SourceResult};
use crate::core::normalize::{artist_or_unknown, duration_from_millis, id_string};
use crate::models::{Playable, Source, Track};
use crate::utils::network::stream_reachable;

const SOUNDCLOUD_API_BASE: &str = "https://api.soundcloud.com";
const NOT_STREAMABLE_MESSAGE: &str = "Track is not streamable - opens in SoundCloud";
const EXTERNAL_MESSAGE: &str =
    "Opens in SoundCloud - Direct streaming requires SoundCloud Pro API access";

#[derive(Debug, Deserialize)]
struct SoundcloudTrack {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: String,
    user: Option<SoundcloudUser>,
    artwork_url: Option<String>,
    duration: Option<u64>,
    permalink_url: Option<String>,
    stream_url: Option<String>,
    #[serde(default)]
    streamable: bool,
    waveform_url: Option<String>,
    downloadable: Option<bool>,
    playback_count: Option<u64>,
    favoritings_count: Option<u64>,
    comment_count: Option<u64>,
    created_at: Option<String>,
    genre: Option<String>,
    tag_list: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SoundcloudUser {
    id: Option<Value>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SoundcloudPlaylist {
    #[serde(default)]
    tracks: Vec<SoundcloudTrack>,
}

pub struct SoundcloudSource {
    client: Client,
    client_id: String,
    stream_check_timeout: Duration,
}

impl SoundcloudSource {
    pub fn new(client: Client, client_id: String, stream_check_timeout: Duration) -> Self {
        Self {
            client,
            client_id,
            stream_check_timeout,
        }
    }

    fn client_id(&self) -> SourceResult<&str> {
        if self.client_id.is_empty() {
            return Err(SourceError::MissingCredentials(Source::Soundcloud));
        }
        Ok(&self.client_id)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let client_id = self.client_id()?;
        let resp = self
            .client
            .get(format!("{}{}", SOUNDCLOUD_API_BASE, path))
            .query(query)
            .query(&[("client_id", client_id)])
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            error!("SoundCloud client ID is invalid");
        }
        Ok(ensure_success(resp, Source::Soundcloud)?.json().await?)
    }

    async fn fetch_track(&self, track_id: &str) -> SourceResult<SoundcloudTrack> {
        if track_id.trim().is_empty() {
            return Err(SourceError::InvalidId {
                provider: Source::Soundcloud,
                id: track_id.to_string(),
            });
        }
        self.get(&format!("/tracks/{}", track_id), &[]).await
    }

    pub async fn track_details(&self, track_id: &str) -> SourceResult<Track> {
        let raw = self.fetch_track(track_id).await?;
        map_track(&raw).ok_or_else(|| SourceError::Decode {
            provider: Source::Soundcloud,
            message: "track without id".to_string(),
        })
    }

    pub async fn user_tracks(&self, user_id: &str, limit: usize) -> Vec<Track> {
        let result = self
            .get::<Vec<SoundcloudTrack>>(
                &format!("/users/{}/tracks", user_id),
                &[("limit", limit.to_string())],
            )
            .await
            .map(|tracks| tracks.iter().filter_map(map_track).collect());
        or_empty(Source::Soundcloud, "user tracks", result)
    }

    pub async fn playlist_tracks(&self, playlist_id: &str) -> Vec<Track> {
        let result = self
            .get::<SoundcloudPlaylist>(&format!("/playlists/{}", playlist_id), &[])
            .await
            .map(|playlist| playlist.tracks.iter().filter_map(map_track).collect());
        or_empty(Source::Soundcloud, "playlist tracks", result)
    }

    /// Authenticated stream url for a streamable track
    fn authorized_stream_url(&self, raw: &SoundcloudTrack) -> Option<String> {
        let base = raw.stream_url.as_deref().filter(|u| !u.is_empty())?;
        let sep = if base.contains('?') { '&' } else { '?' };
        Some(format!("{}{}client_id={}", base, sep, self.client_id))
    }
}

/// Artwork urls come in the 100px "large" size; ask for 300px instead
fn upsize_artwork(url: &str) -> String {
    url.replace("large", "t300x300")
}

fn map_track(raw: &SoundcloudTrack) -> Option<Track> {
    let sid = id_string(&raw.id)?;
    let user = raw.user.as_ref();

    Some(
        Track::new(
            Source::Soundcloud,
            sid,
            &raw.title,
            &artist_or_unknown(user.and_then(|u| u.username.as_deref())),
            raw.permalink_url.clone().unwrap_or_default(),
        )
        .with_thumbnail(raw.artwork_url.as_deref().map(upsize_artwork))
        .with_duration(duration_from_millis(raw.duration))
        .with_meta("waveformUrl", json!(raw.waveform_url))
        .with_meta("streamable", json!(raw.streamable))
        .with_meta("downloadable", json!(raw.downloadable))
        .with_meta("playbackCount", json!(raw.playback_count))
        .with_meta("favoritingsCount", json!(raw.favoritings_count))
        .with_meta("commentCount", json!(raw.comment_count))
        .with_meta("createdAt", json!(raw.created_at))
        .with_meta("genre", json!(raw.genre))
        .with_meta("tagList", json!(raw.tag_list))
        .with_meta("description", json!(raw.description))
        .with_meta("userId", json!(user.and_then(|u| u.id.clone()))),
    )
}

#[async_trait]
impl SourceAdapter for SoundcloudSource {
    fn source(&self) -> Source {
        Source::Soundcloud
    }

    async fn try_search(&self, query: &str, limit: usize) -> SourceResult<Vec<Track>> {
        let tracks: Vec<SoundcloudTrack> = self
            .get(
                "/tracks",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(tracks.iter().filter_map(map_track).collect())
    }

    async fn resolve_playback(&self, sid: &str) -> SourceResult<Playable> {
        let raw = self.fetch_track(sid).await?;
        let track = map_track(&raw).ok_or_else(|| SourceError::Decode {
            provider: Source::Soundcloud,
            message: "track without id".to_string(),
        })?;

        if !raw.streamable {
            return Ok(Playable::external(track.fallback_url(), NOT_STREAMABLE_MESSAGE));
        }

        if let Some(stream_url) = self.authorized_stream_url(&raw) {
            if stream_reachable(&self.client, &stream_url, self.stream_check_timeout).await {
                return Ok(Playable::Direct {
                    stream_url,
                    expires_at: None,
                    is_live: false,
                });
            }
            debug!("SoundCloud stream for {} did not answer", sid);
        }

        Ok(Playable::external(track.fallback_url(), EXTERNAL_MESSAGE))
    }
}
