//! Favorite tracks API routes

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use super::{client_key, session_id, AppState};
use crate::core::Route;
use crate::db::{FavoriteTable, TrackTable};
use crate::error::{ApiError, ApiResult};
use crate::models::{FavoriteEntry, Track, TrackKey};

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub tracks: Vec<FavoriteEntry>,
    pub total: usize,
}

async fn favorites(pool: &SqlitePool, session: &str) -> ApiResult<FavoritesResponse> {
    let tracks = FavoriteTable::list(pool, session).await?;
    Ok(FavoritesResponse {
        total: tracks.len(),
        tracks,
    })
}

/// The caller's favorites, newest first
#[get("")]
pub async fn get_favorites(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let response = favorites(state.db.pool(), &session_id(&req)).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub action: Option<String>,
    pub track: Option<Track>,
    /// `source:sid`, an alternative to `track` for removal
    pub track_id: Option<String>,
}

/// Add or remove a favorite; repeating either is a no-op
#[post("")]
pub async fn update_favorites(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<FavoriteRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let body = body.into_inner();
    let session = session_id(&req);
    let pool = state.db.pool();

    let action = match body.action.as_deref() {
        Some("add") => {
            let track = body
                .track
                .map(Track::normalized)
                .filter(|track| !track.sid.trim().is_empty())
                .ok_or_else(|| ApiError::field("track", "Track data required for add action"))?;

            TrackTable::upsert(pool, &track).await?;
            if !FavoriteTable::add(pool, &session, &track.key(), Utc::now()).await? {
                debug!("{} is already a favorite of {}", track.key(), session);
            }
            "add"
        }
        Some("remove") => {
            let key = match (body.track_id, body.track) {
                (Some(id), _) => id
                    .parse::<TrackKey>()
                    .map_err(|e| ApiError::field("trackId", e))?,
                (None, Some(track)) => track.key(),
                (None, None) => {
                    return Err(ApiError::field(
                        "trackId",
                        "Track ID or track data required for remove action",
                    ))
                }
            };

            FavoriteTable::remove(pool, &session, &key).await?;
            "remove"
        }
        _ => return Err(ApiError::field("action", r#"Action must be "add" or "remove""#)),
    };

    let response = favorites(pool, &session).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "tracks": response.tracks,
        "total": response.total,
        "action": action,
        "success": true,
    })))
}

/// Configure favorites routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_favorites).service(update_favorites);
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{test_app, test_state};
    use crate::api::SESSION_HEADER;
    use actix_web::test;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_add_list_remove() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let track = json!({"source": "deezer", "sid": "7", "title": "Seven", "duration": 180});
        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/music/favorites")
                .set_json(json!({"action": "add", "track": track}))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["success"], true);
            assert_eq!(body["action"], "add");
            // adding twice keeps one entry
            assert_eq!(body["total"], 1);
        }

        let req = test::TestRequest::get().uri("/api/music/favorites").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tracks"][0]["title"], "Seven");
        assert!(body["tracks"][0]["addedAt"].is_string());

        // other sessions see their own list
        let req = test::TestRequest::get()
            .uri("/api/music/favorites")
            .insert_header((SESSION_HEADER, "other"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 0);

        let req = test::TestRequest::post()
            .uri("/api/music/favorites")
            .set_json(json!({"action": "remove", "trackId": "deezer:7"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 0);
        assert_eq!(body["action"], "remove");
    }

    #[actix_web::test]
    async fn test_validation() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        for (payload, field) in [
            (json!({"action": "toggle"}), "action"),
            (json!({"track": {"source": "deezer", "sid": "1"}}), "action"),
            (json!({"action": "add"}), "track"),
            (json!({"action": "add", "track": {"source": "deezer", "sid": " "}}), "track"),
            (json!({"action": "remove"}), "trackId"),
            (json!({"action": "remove", "trackId": "nowhere"}), "trackId"),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/music/favorites")
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"]["field"], field);
        }
    }
}
