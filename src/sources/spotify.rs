//! Spotify adapter
//!
//! Client-credentials only, so full tracks are never streamable here; the
//! best we can offer is the 30 second preview clip.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ensure_success, or_empty, SourceAdapter, SourceError, SourceResult};
use crate::core::normalize::{duration_from_millis, join_artists};
use crate::models::{Playable, Source, Track};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Tokens are refreshed this long before Spotify says they expire
const TOKEN_MARGIN: Duration = Duration::from_secs(60);
const PREVIEW_SECONDS: u32 = 30;
const PREVIEW_MESSAGE: &str =
    "30-second preview - Full track requires Spotify Premium & Web Playback SDK";
const EXTERNAL_MESSAGE: &str =
    "Full track available on Spotify - Premium subscription required for full playback";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging>,
}

#[derive(Debug, Default, Deserialize)]
struct Paging {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    #[serde(default)]
    tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: Option<SpotifyAlbum>,
    duration_ms: Option<u64>,
    #[serde(default)]
    explicit: bool,
    preview_url: Option<String>,
    #[serde(default)]
    external_urls: ExternalUrls,
    external_ids: Option<ExternalIds>,
    popularity: Option<u32>,
    track_number: Option<u32>,
    disc_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    id: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    id: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    isrc: Option<String>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifySource {
    client: Client,
    client_id: String,
    client_secret: String,
    market: String,
    token: RwLock<Option<CachedToken>>,
}

impl SpotifySource {
    pub fn new(client: Client, client_id: String, client_secret: String, market: String) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            market,
            token: RwLock::new(None),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Get a bearer token, reusing the cached one while it is fresh
    async fn access_token(&self) -> SourceResult<String> {
        if !self.has_credentials() {
            return Err(SourceError::MissingCredentials(Source::Spotify));
        }

        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.expires_at {
                    return Ok(token.value.clone());
                }
            }
        }

        let resp = self
            .client
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let body: TokenResponse = ensure_success(resp, Source::Spotify)?.json().await?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_MARGIN);
        let value = body.access_token;
        *self.token.write().await = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!("Refreshed Spotify access token");

        Ok(value)
    }

    async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    /// GET an API path with the bearer token, dropping the token on 401
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(format!("{}{}", SPOTIFY_API_BASE, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            self.clear_token().await;
        }
        Ok(ensure_success(resp, Source::Spotify)?.json().await?)
    }

    pub async fn track_details(&self, track_id: &str) -> SourceResult<Track> {
        let track: SpotifyTrack = self
            .get_json(
                &format!("/tracks/{}", track_id),
                &[("market", self.market.clone())],
            )
            .await?;
        Ok(map_track(&track))
    }

    pub async fn album_tracks(&self, album_id: &str) -> Vec<Track> {
        let result = self
            .get_json::<Paging>(
                &format!("/albums/{}/tracks", album_id),
                &[("market", self.market.clone()), ("limit", "50".to_string())],
            )
            .await
            .map(|page| page.items.iter().map(map_track).collect());
        or_empty(Source::Spotify, "album tracks", result)
    }

    pub async fn artist_top_tracks(&self, artist_id: &str, limit: usize) -> Vec<Track> {
        let result = self
            .get_json::<TopTracksResponse>(
                &format!("/artists/{}/top-tracks", artist_id),
                &[("market", self.market.clone())],
            )
            .await
            .map(|top| top.tracks.iter().take(limit).map(map_track).collect());
        or_empty(Source::Spotify, "artist top tracks", result)
    }
}

fn map_track(track: &SpotifyTrack) -> Track {
    let album = track.album.as_ref();
    // second image is the 300px rendition
    let thumbnail = album
        .and_then(|a| a.images.get(1).or_else(|| a.images.first()))
        .map(|img| img.url.clone());
    let url = track
        .external_urls
        .spotify
        .clone()
        .or_else(|| Source::Spotify.canonical_url(&track.id))
        .unwrap_or_default();
    let artist_ids: Vec<&str> = track.artists.iter().filter_map(|a| a.id.as_deref()).collect();

    Track::new(
        Source::Spotify,
        track.id.clone(),
        &track.name,
        &join_artists(track.artists.iter().map(|a| a.name.as_str())),
        url,
    )
    .with_album(album.and_then(|a| a.name.as_deref()))
    .with_thumbnail(thumbnail)
    .with_duration(duration_from_millis(track.duration_ms))
    .with_explicit(track.explicit)
    .with_meta("isrc", json!(track.external_ids.as_ref().and_then(|e| e.isrc.clone())))
    .with_meta("popularity", json!(track.popularity))
    .with_meta("previewUrl", json!(track.preview_url))
    .with_meta("albumId", json!(album.and_then(|a| a.id.clone())))
    .with_meta("artistIds", json!(artist_ids))
    .with_meta("releaseDate", json!(album.and_then(|a| a.release_date.clone())))
    .with_meta("trackNumber", json!(track.track_number))
    .with_meta("discNumber", json!(track.disc_number))
}

/// Preview when Spotify hands out a clip, otherwise send the user to Spotify
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
impl SourceAdapter for SpotifySource {
    fn source(&self) -> Source {
        Source::Spotify
    }

    async fn try_search(&self, query: &str, limit: usize) -> SourceResult<Vec<Track>> {
        let body: SearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                    ("market", self.market.clone()),
                ],
            )
            .await?;

        Ok(body
            .tracks
            .unwrap_or_default()
            .items
            .iter()
            .map(map_track)
            .collect())
    }

    async fn resolve_playback(&self, sid: &str) -> SourceResult<Playable> {
        let track = self.track_details(sid).await?;
        Ok(playable_for(&track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::UNKNOWN_ARTIST;

    fn fixture() -> SpotifyTrack {
        serde_json::from_value(json!({
            "id": "3n3Ppam7vgaVa1iaRUc9Lp",
            "name": "Mr. Brightside",
            "artists": [{"id": "a1", "name": "The Killers"}, {"id": "a2", "name": "Guest"}],
            "album": {
                "id": "al1",
                "name": "Hot Fuss",
                "images": [{"url": "https://i.scdn.co/640"}, {"url": "https://i.scdn.co/300"}]
            },
            "duration_ms": 222075,
            "explicit": true,
            "preview_url": "https://p.scdn.co/mp3-preview/abc",
            "external_urls": {"spotify": "https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp"}
        }))
        .unwrap()
    }

    #[test]
    fn test_map_track() {
        let track = map_track(&fixture());
        assert_eq!(track.artist, "The Killers, Guest");
        assert_eq!(track.album.as_deref(), Some("Hot Fuss"));
        assert_eq!(track.thumbnail_url.as_deref(), Some("https://i.scdn.co/300"));
        assert_eq!(track.duration, Some(222));
        assert!(track.explicit);
        assert_eq!(track.metadata["artistIds"], json!(["a1", "a2"]));
    }

    #[test]
    fn test_map_track_without_artists_or_urls() {
        let raw: SpotifyTrack =
            serde_json::from_value(json!({"id": "x1", "name": "Loose"})).unwrap();
        let track = map_track(&raw);
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.url, "https://open.spotify.com/track/x1");
        assert_eq!(track.duration, None);
        assert!(!track.explicit);
    }

    #[test]
    fn test_playable_prefers_preview() {
        let track = map_track(&fixture());
        match playable_for(&track) {
            Playable::Preview { duration, stream_url, .. } => {
                assert_eq!(duration, 30);
                assert_eq!(stream_url, "https://p.scdn.co/mp3-preview/abc");
            }
            other => panic!("expected preview, got {:?}", other),
        }

        let mut raw = fixture();
        raw.preview_url = None;
        let playable = playable_for(&map_track(&raw));
        assert_eq!(
            playable,
            Playable::external(
                "https://open.spotify.com/track/3n3Ppam7vgaVa1iaRUc9Lp",
                EXTERNAL_MESSAGE
            )
        );
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let spotify = SpotifySource::new(Client::new(), String::new(), String::new(), "US".into());
        assert!(spotify.search("anything", 5).await.is_empty());
        assert!(matches!(
            spotify.resolve_playback("x1").await,
            Err(SourceError::MissingCredentials(Source::Spotify))
        ));
    }
}
