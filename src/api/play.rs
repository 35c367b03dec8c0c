//! Playback resolution API routes

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{client_key, AppState};
use crate::core::{Resolve, Route};
use crate::db::TrackTable;
use crate::error::{ApiError, ApiResult};
use crate::models::{Playable, Source, Track};

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub source: Option<String>,
    pub sid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub track: Track,
    pub playable: Playable,
}

/// Look up a known track. Radio stations are known without a prior search.
async fn find_track(state: &AppState, source: Source, sid: &str) -> ApiResult<Option<Track>> {
    if let Some(track) = TrackTable::get(state.db.pool(), source, sid).await? {
        return Ok(Some(track));
    }

    if source == Source::Radio {
        if let Some(station) = state.providers.radio.station(sid) {
            let track = station.to_track();
            TrackTable::upsert(state.db.pool(), &track).await?;
            return Ok(Some(track));
        }
    }

    Ok(None)
}

/// Resolve how a track should be played
#[post("")]
pub async fn play(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PlayRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Play, &client_key(&req))?;

    let source = body.source.as_deref().map(str::trim).unwrap_or_default();
    let sid = body.sid.as_deref().map(str::trim).unwrap_or_default();
    if source.is_empty() || sid.is_empty() {
        return Err(ApiError::validation("Source and sid are required"));
    }
    let source: Source = source
        .parse()
        .map_err(|_| ApiError::field("source", "Unsupported source"))?;

    let track = find_track(&state, source, sid).await?.ok_or_else(|| {
        ApiError::validation("Track not found. Please search for the track first.")
    })?;
    let playable = state.resolver.resolve(&track).await;

    Ok(HttpResponse::Ok().json(PlayResponse { track, playable }))
}

/// Configure playback routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(play);
}
