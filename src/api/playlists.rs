//! User playlist API routes

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;

use super::{client_key, session_id, AppState};
use crate::core::Route;
use crate::db::{PlaylistTable, TrackTable};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Playlist, PlaylistChanges, PlaylistPosition, Track, TrackKey, MAX_PLAYLIST_DESCRIPTION_LEN,
    MAX_PLAYLIST_NAME_LEN,
};

const NOT_FOUND: &str = "Playlist not found";

#[derive(Debug, Serialize)]
pub struct PlaylistsResponse {
    pub playlists: Vec<Playlist>,
    pub total: usize,
}

fn valid_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.chars().count() > MAX_PLAYLIST_NAME_LEN {
        return Err(ApiError::field(
            "name",
            format!("Playlist name must be {} characters or less", MAX_PLAYLIST_NAME_LEN),
        ));
    }
    Ok(name.to_string())
}

fn valid_description(description: &str) -> ApiResult<String> {
    let description = description.trim();
    if description.chars().count() > MAX_PLAYLIST_DESCRIPTION_LEN {
        return Err(ApiError::field(
            "description",
            format!(
                "Description must be {} characters or less",
                MAX_PLAYLIST_DESCRIPTION_LEN
            ),
        ));
    }
    Ok(description.to_string())
}

async fn owned(pool: &SqlitePool, session: &str, id: i64) -> ApiResult<Playlist> {
    PlaylistTable::get(pool, session, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

/// The caller's playlists, most recently updated first
#[get("")]
pub async fn list_playlists(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let playlists = PlaylistTable::all(state.db.pool(), &session_id(&req)).await?;
    Ok(HttpResponse::Ok().json(PlaylistsResponse {
        total: playlists.len(),
        playlists,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
}

#[post("")]
pub async fn create_playlist(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreatePlaylistRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let body = body.into_inner();
    let name = valid_name(body.name.as_deref().unwrap_or_default())?;
    if name.is_empty() {
        return Err(ApiError::field("name", "Playlist name is required"));
    }
    let description = valid_description(&body.description)?;

    let session = session_id(&req);
    let pool = state.db.pool();
    if PlaylistTable::name_exists(pool, &session, &name, None).await? {
        return Err(ApiError::field(
            "name",
            "You already have a playlist with this name",
        ));
    }

    let id = PlaylistTable::insert(pool, &session, &name, &description, body.is_public).await?;
    let playlist = owned(pool, &session, id).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "playlist": playlist,
        "message": "Playlist created successfully",
    })))
}

#[get("/{id}")]
pub async fn get_playlist(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let playlist = owned(state.db.pool(), &session_id(&req), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "playlist": playlist })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub cover_url: Option<String>,
}

/// Change any of name, description, visibility or cover
#[put("/{id}")]
pub async fn update_playlist(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdatePlaylistRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let id = path.into_inner();
    let session = session_id(&req);
    let pool = state.db.pool();
    owned(pool, &session, id).await?;

    let body = body.into_inner();
    let name = match body.name.as_deref() {
        Some(name) => {
            let name = valid_name(name)?;
            if name.is_empty() {
                return Err(ApiError::field("name", "Playlist name cannot be empty"));
            }
            if PlaylistTable::name_exists(pool, &session, &name, Some(id)).await? {
                return Err(ApiError::field(
                    "name",
                    "You already have a playlist with this name",
                ));
            }
            Some(name)
        }
        None => None,
    };
    let changes = PlaylistChanges {
        name,
        description: body.description.as_deref().map(valid_description).transpose()?,
        is_public: body.is_public,
        cover_url: body.cover_url,
    };

    PlaylistTable::update(pool, &session, id, &changes).await?;
    let playlist = owned(pool, &session, id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "playlist": playlist,
        "message": "Playlist updated successfully",
    })))
}

#[delete("/{id}")]
pub async fn delete_playlist(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    if !PlaylistTable::delete(state.db.pool(), &session_id(&req), path.into_inner()).await? {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Playlist deleted successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    pub track: Option<Track>,
    #[serde(default)]
    pub position: PlaylistPosition,
}

#[post("/{id}/tracks")]
pub async fn add_track(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<AddTrackRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let id = path.into_inner();
    let session = session_id(&req);
    let pool = state.db.pool();
    owned(pool, &session, id).await?;

    let body = body.into_inner();
    let track = body
        .track
        .map(Track::normalized)
        .filter(|track| !track.sid.trim().is_empty())
        .ok_or_else(|| ApiError::field("track", "Track data is required"))?;

    TrackTable::upsert(pool, &track).await?;
    if !PlaylistTable::add_track(pool, id, &track.key(), body.position).await? {
        return Err(ApiError::field("track", "Track is already in this playlist"));
    }

    let playlist = owned(pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "playlist": playlist,
        "message": "Track added to playlist",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTrackRequest {
    /// `source:sid`
    pub track_id: Option<String>,
}

#[delete("/{id}/tracks")]
pub async fn remove_track(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<RemoveTrackRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let id = path.into_inner();
    let session = session_id(&req);
    let pool = state.db.pool();
    owned(pool, &session, id).await?;

    let key: TrackKey = body
        .into_inner()
        .track_id
        .ok_or_else(|| ApiError::field("trackId", "Track ID is required"))?
        .parse()
        .map_err(|e: String| ApiError::field("trackId", e))?;

    PlaylistTable::remove_track(pool, id, &key).await?;

    let playlist = owned(pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "playlist": playlist,
        "message": "Track removed from playlist",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub track_ids: Option<serde_json::Value>,
}

/// Set the playlist order; tracks left out of `trackIds` are removed
#[put("/{id}/tracks")]
pub async fn reorder_tracks(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ReorderRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Library, &client_key(&req))?;

    let id = path.into_inner();
    let session = session_id(&req);
    let pool = state.db.pool();
    owned(pool, &session, id).await?;

    let ids = match body.into_inner().track_ids {
        Some(serde_json::Value::Array(ids)) => ids,
        _ => return Err(ApiError::field("trackIds", "trackIds must be an array")),
    };

    let present: HashSet<TrackKey> = PlaylistTable::track_keys(pool, id)
        .await?
        .into_iter()
        .collect();
    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(ids.len());
    for value in ids {
        let key = value
            .as_str()
            .and_then(|id| id.parse::<TrackKey>().ok())
            .filter(|key| present.contains(key))
            .ok_or_else(|| {
                ApiError::field("trackIds", "Some track IDs are not in this playlist")
            })?;
        if seen.insert(key.clone()) {
            order.push(key);
        }
    }

    PlaylistTable::reorder(pool, id, &order).await?;

    let playlist = owned(pool, &session, id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "playlist": playlist,
        "message": "Playlist tracks reordered",
    })))
}

/// Configure playlist routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_playlists)
        .service(create_playlist)
        .service(get_playlist)
        .service(update_playlist)
        .service(delete_playlist)
        .service(add_track)
        .service(remove_track)
        .service(reorder_tracks);
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{test_app, test_state};
    use crate::api::SESSION_HEADER;
    use actix_web::test;
    use serde_json::{json, Value};

    fn track(sid: &str, duration: u32) -> Value {
        json!({"source": "soundcloud", "sid": sid, "title": format!("Song {}", sid), "duration": duration})
    }

    fn sids(body: &Value) -> Vec<String> {
        body["playlist"]["tracks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["sid"].as_str().unwrap().to_string())
            .collect()
    }

    #[actix_web::test]
    async fn test_create_and_validate() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/playlists")
            .set_json(json!({"name": "  Focus  ", "description": "deep work"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["playlist"]["name"], "Focus");
        assert_eq!(body["playlist"]["trackCount"], 0);
        assert_eq!(body["message"], "Playlist created successfully");

        for payload in [
            json!({"name": "Focus"}),
            json!({}),
            json!({"name": "   "}),
            json!({"name": "x".repeat(101)}),
            json!({"name": "Long", "description": "d".repeat(501)}),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/music/playlists")
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400);
        }

        // names are unique per session only
        let req = test::TestRequest::post()
            .uri("/api/music/playlists")
            .insert_header((SESSION_HEADER, "other"))
            .set_json(json!({"name": "Focus"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);

        let req = test::TestRequest::get().uri("/api/music/playlists").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
    }

    #[actix_web::test]
    async fn test_update_and_delete() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/playlists")
            .set_json(json!({"name": "A"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["playlist"]["id"].as_i64().unwrap();
        let req = test::TestRequest::post()
            .uri("/api/music/playlists")
            .set_json(json!({"name": "B"}))
            .to_request();
        test::call_service(&app, req).await;

        let uri = format!("/api/music/playlists/{}", id);
        let req = test::TestRequest::put()
            .uri(&uri)
            .set_json(json!({"name": "Renamed", "isPublic": true}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["playlist"]["name"], "Renamed");
        assert_eq!(body["playlist"]["isPublic"], true);
        assert_eq!(body["message"], "Playlist updated successfully");

        for payload in [json!({"name": ""}), json!({"name": "B"})] {
            let req = test::TestRequest::put().uri(&uri).set_json(payload).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400);
        }

        // another session cannot see or touch it
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header((SESSION_HEADER, "other"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Playlist deleted successfully");

        let req = test::TestRequest::delete().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "Playlist not found");
    }

    #[actix_web::test]
    async fn test_track_operations() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/playlists")
            .set_json(json!({"name": "Mix"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let uri = format!("/api/music/playlists/{}/tracks", body["playlist"]["id"]);

        for (sid, position) in [("1", "end"), ("2", "end"), ("3", "start")] {
            let req = test::TestRequest::post()
                .uri(&uri)
                .set_json(json!({"track": track(sid, 100), "position": position}))
                .to_request();
            let body: Value = test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["message"], "Track added to playlist");
        }

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({"track": track("1", 100)}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "Track is already in this playlist");

        let req = test::TestRequest::put()
            .uri(&uri)
            .set_json(json!({"trackIds": ["soundcloud:2", "soundcloud:3", "soundcloud:1"]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(sids(&body), ["2", "3", "1"]);
        assert_eq!(body["playlist"]["totalDuration"], 300);

        for payload in [
            json!({"trackIds": "soundcloud:2"}),
            json!({"trackIds": ["soundcloud:2", "deezer:9"]}),
        ] {
            let req = test::TestRequest::put().uri(&uri).set_json(payload).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 400);
        }

        let req = test::TestRequest::delete()
            .uri(&uri)
            .set_json(json!({"trackId": "soundcloud:3"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Track removed from playlist");
        assert_eq!(sids(&body), ["2", "1"]);
        assert_eq!(body["playlist"]["trackCount"], 2);

        let req = test::TestRequest::post()
            .uri("/api/music/playlists/999/tracks")
            .set_json(json!({"track": track("1", 100)}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
