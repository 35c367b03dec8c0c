//! YouTube and YouTube Music adapter
//!
//! Uses the YouTube Data API v3. Videos are never streamed directly; the
//! terms of service only allow sending the user to YouTube.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

use super::{ensure_success, or_empty, SourceAdapter, SourceError, SourceResult};
use crate::core::normalize::{artist_or_unknown, clean_youtube_title, parse_iso8601_duration};
use crate::models::{Playable, Source, Track};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
/// "Music" video category
const MUSIC_CATEGORY: &str = "10";
const EXTERNAL_MESSAGE: &str =
    "Opens in YouTube - Direct streaming not available due to YouTube Terms of Service";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle")]
    channel_title: Option<String>,
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    #[serde(default)]
    snippet: Option<Snippet>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
}

/// YouTube adapter; the `ytmusic` flavour shares the API and differs only
/// in its source tag and canonical urls
pub struct YoutubeSource {
    client: Client,
    api_key: String,
    source: Source,
}

impl YoutubeSource {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            source: Source::Youtube,
        }
    }

    pub fn music(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            source: Source::Ytmusic,
        }
    }

    fn api_key(&self) -> SourceResult<&str> {
        if self.api_key.is_empty() {
            return Err(SourceError::MissingCredentials(self.source));
        }
        Ok(&self.api_key)
    }

    fn watch_url(&self, video_id: &str) -> String {
        self.source.canonical_url(video_id).unwrap_or_default()
    }

    async fn fetch_videos(&self, ids: &[String], parts: &str) -> SourceResult<Vec<Video>> {
        let key = self.api_key()?;
        let resp = self
            .client
            .get(format!("{}/videos", YOUTUBE_API_BASE))
            .query(&[("part", parts), ("id", &ids.join(",")), ("key", key)])
            .send()
            .await?;
        let body: VideosResponse = ensure_success(resp, self.source)?.json().await?;
        Ok(body.items)
    }

    /// Full details for one video
    pub async fn track_details(&self, video_id: &str) -> SourceResult<Track> {
        let videos = self
            .fetch_videos(&[video_id.to_string()], "snippet,contentDetails,statistics")
            .await?;
        let video = videos.into_iter().next().ok_or_else(|| SourceError::NotFound {
            provider: self.source,
            id: video_id.to_string(),
        })?;
        let snippet = video.snippet.as_ref().ok_or_else(|| SourceError::Decode {
            provider: self.source,
            message: "video without snippet".to_string(),
        })?;
        Ok(self.map_video(&video.id, snippet, Some(&video)))
    }

    /// Most popular music videos in the US region
    pub async fn trending(&self, limit: usize) -> Vec<Track> {
        or_empty(self.source, "trending", self.try_trending(limit).await)
    }

    async fn try_trending(&self, limit: usize) -> SourceResult<Vec<Track>> {
        let key = self.api_key()?;
        let resp = self
            .client
            .get(format!("{}/videos", YOUTUBE_API_BASE))
            .query(&[
                ("part", "snippet,contentDetails"),
                ("chart", "mostPopular"),
                ("videoCategoryId", MUSIC_CATEGORY),
                ("regionCode", "US"),
                ("maxResults", &limit.to_string()),
                ("key", key),
            ])
            .send()
            .await?;
        let body: VideosResponse = ensure_success(resp, self.source)?.json().await?;

        Ok(body
            .items
            .iter()
            .filter_map(|video| {
                let snippet = video.snippet.as_ref()?;
                Some(
                    self.map_video(&video.id, snippet, Some(video))
                        .with_meta("trending", json!(true)),
                )
            })
            .collect())
    }

    fn map_video(&self, video_id: &str, snippet: &Snippet, details: Option<&Video>) -> Track {
        let duration = details
            .and_then(|d| d.content_details.as_ref())
            .and_then(|c| c.duration.as_deref())
            .and_then(parse_iso8601_duration);
        let stats = details.and_then(|d| d.statistics.as_ref());
        let thumbnail = snippet
            .thumbnails
            .medium
            .as_ref()
            .or(snippet.thumbnails.default.as_ref())
            .map(|t| t.url.clone());

        Track::new(
            self.source,
            video_id,
            &clean_youtube_title(&snippet.title),
            &artist_or_unknown(snippet.channel_title.as_deref()),
            self.watch_url(video_id),
        )
        .with_thumbnail(thumbnail)
        .with_duration(duration)
        .with_meta("description", json!(snippet.description))
        .with_meta("publishedAt", json!(snippet.published_at))
        .with_meta("channelId", json!(snippet.channel_id))
        .with_meta("viewCount", json!(stats.and_then(|s| s.view_count.clone())))
        .with_meta("likeCount", json!(stats.and_then(|s| s.like_count.clone())))
    }

    fn map_search(&self, search: SearchResponse, videos: Vec<Video>) -> Vec<Track> {
        let details: HashMap<&str, &Video> = videos.iter().map(|v| (v.id.as_str(), v)).collect();

        search
            .items
            .iter()
            .filter_map(|item| {
                let id = item.id.video_id.as_deref()?;
                Some(self.map_video(id, &item.snippet, details.get(id).copied()))
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for YoutubeSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn try_search(&self, query: &str, limit: usize) -> SourceResult<Vec<Track>> {
        let key = self.api_key()?;
        let resp = self
            .client
            .get(format!("{}/search", YOUTUBE_API_BASE))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("videoCategoryId", MUSIC_CATEGORY),
                ("maxResults", &limit.to_string()),
                ("q", query),
                ("key", key),
            ])
            .send()
            .await?;
        let search: SearchResponse = ensure_success(resp, self.source)?.json().await?;

        let ids: Vec<String> = search
            .items
            .iter()
            .filter_map(|item| item.id.video_id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // durations live on the videos endpoint; results stay usable without them
        let videos = match self.fetch_videos(&ids, "contentDetails,statistics").await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::debug!("YouTube details lookup failed: {}", e);
                Vec::new()
            }
        };

        Ok(self.map_search(search, videos))
    }

    async fn resolve_playback(&self, sid: &str) -> SourceResult<Playable> {
        if sid.trim().is_empty() {
            return Err(SourceError::InvalidId {
                provider: self.source,
                id: sid.to_string(),
            });
        }
        Ok(Playable::external(self.watch_url(sid), EXTERNAL_MESSAGE))
    }
}
