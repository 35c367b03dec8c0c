//! Charts and trending routes

use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{client_key, AppState};
use crate::core::Route;
use crate::db::TrackTable;
use crate::error::{ApiError, ApiResult};
use crate::models::{Source, Track};
use crate::sources::SourceError;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TrackListResponse {
    pub source: Source,
    pub total: usize,
    pub tracks: Vec<Track>,
}

async fn respond(state: &AppState, source: Source, tracks: Vec<Track>) -> HttpResponse {
    if let Err(e) = TrackTable::upsert_many(state.db.pool(), &tracks).await {
        warn!("Failed to cache {} tracks: {}", source, e);
    }
    HttpResponse::Ok().json(TrackListResponse {
        source,
        total: tracks.len(),
        tracks,
    })
}

/// Deezer top tracks
#[get("/charts")]
pub async fn charts(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;
    let limit = state.config.search_limit(query.limit);
    let tracks = state.providers.deezer.charts(limit).await;
    Ok(respond(&state, Source::Deezer, tracks).await)
}

/// Most popular YouTube music videos
#[get("/trending")]
pub async fn trending(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;
    let limit = state.config.search_limit(query.limit);
    let tracks = state.providers.youtube.trending(limit).await;
    Ok(respond(&state, Source::Youtube, tracks).await)
}

fn parse_source(raw: &str) -> ApiResult<Source> {
    raw.parse()
        .map_err(|_| ApiError::field("source", "Unsupported source"))
}

fn unsupported(source: Source, what: &str) -> ApiError {
    ApiError::field(
        "source",
        format!("{} does not provide {}", source.display_name(), what),
    )
}

/// Tracks of an album
#[get("/album/{source}/{id}")]
pub async fn album(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;
    let (source, id) = path.into_inner();
    let source = parse_source(&source)?;

    let tracks = match source {
        Source::Spotify => state.providers.spotify.album_tracks(&id).await,
        Source::Deezer => state.providers.deezer.album_tracks(&id).await,
        other => return Err(unsupported(other, "albums")),
    };
    Ok(respond(&state, source, tracks).await)
}

/// An artist's most popular tracks
#[get("/artist/{source}/{id}/top")]
pub async fn artist_top(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<LimitQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;
    let (source, id) = path.into_inner();
    let source = parse_source(&source)?;
    let limit = state.config.search_limit(query.limit);

    let tracks = match source {
        Source::Spotify => state.providers.spotify.artist_top_tracks(&id, limit).await,
        Source::Deezer => state.providers.deezer.artist_top_tracks(&id, limit).await,
        Source::Soundcloud => state.providers.soundcloud.user_tracks(&id, limit).await,
        other => return Err(unsupported(other, "artist tracks")),
    };
    Ok(respond(&state, source, tracks).await)
}

/// Tracks of a public playlist
#[get("/playlist/{source}/{id}")]
pub async fn playlist(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;
    let (source, id) = path.into_inner();
    let source = parse_source(&source)?;

    let tracks = match source {
        Source::Soundcloud => state.providers.soundcloud.playlist_tracks(&id).await,
        other => return Err(unsupported(other, "playlists")),
    };
    Ok(respond(&state, source, tracks).await)
}

/// Metadata for a single track, served from the cache when known
#[get("/track/{source}/{sid}")]
pub async fn track(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;
    let (source, sid) = path.into_inner();
    let source = parse_source(&source)?;

    if let Some(track) = TrackTable::get(state.db.pool(), source, &sid).await? {
        return Ok(HttpResponse::Ok().json(track));
    }

    let providers = &state.providers;
    let fetched = match source {
        Source::Youtube => providers.youtube.track_details(&sid).await,
        Source::Ytmusic => providers.ytmusic.track_details(&sid).await,
        Source::Soundcloud => providers.soundcloud.track_details(&sid).await,
        Source::Spotify => providers.spotify.track_details(&sid).await,
        Source::Deezer => providers.deezer.track_details(&sid).await,
        Source::Radio => providers
            .radio
            .station(&sid)
            .map(|station| station.to_track())
            .ok_or_else(|| SourceError::NotFound {
                provider: Source::Radio,
                id: sid.clone(),
            }),
    };

    let track = match fetched {
        Ok(track) => track.normalized(),
        Err(SourceError::NotFound { .. } | SourceError::InvalidId { .. }) => {
            return Err(ApiError::NotFound("Track not found".to_string()))
        }
        Err(SourceError::MissingCredentials(provider)) => {
            return Err(ApiError::NotFound(format!(
                "{} is not configured on this server",
                provider.display_name()
            )))
        }
        Err(e) => {
            warn!("Track lookup failed for {}:{}: {}", source, sid, e);
            return Err(ApiError::Internal(e.to_string()));
        }
    };

    TrackTable::upsert(state.db.pool(), &track).await?;
    Ok(HttpResponse::Ok().json(track))
}

/// Configure discovery routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(charts)
        .service(trending)
        .service(album)
        .service(artist_top)
        .service(playlist)
        .service(track);
}
