//! Listening history API routes

use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{client_key, session_id, AppState};
use crate::core::Route;
use crate::db::HistoryTable;
use crate::error::{ApiError, ApiResult};
use crate::models::{HistoryRange, Track};
use crate::stores::history_store::record_play;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    #[serde(default)]
    pub range: HistoryRange,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse<T> {
    pub history: Vec<T>,
    pub pagination: Pagination,
    pub unique: bool,
    pub range: HistoryRange,
}

/// Paginated listening history for the caller's session
#[get("")]
pub async fn get_history(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::History, &client_key(&req))?;

    let session = session_id(&req);
    let page = query.page.unwrap_or(1).max(1);
    let limit = match query.limit {
        Some(limit) if limit > 0 => limit.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| ApiError::field("page", "Page is out of range"))?;
    let since = query.range.cutoff(Utc::now());
    let pool = state.db.pool();

    if query.unique {
        let result = HistoryTable::list_unique(pool, &session, since, limit, offset).await?;
        return Ok(HttpResponse::Ok().json(HistoryResponse {
            pagination: Pagination::new(page, limit, result.total),
            history: result.items,
            unique: true,
            range: query.range,
        }));
    }

    let result = HistoryTable::list(pool, &session, since, limit, offset).await?;
    Ok(HttpResponse::Ok().json(HistoryResponse {
        pagination: Pagination::new(page, limit, result.total),
        history: result.items,
        unique: false,
        range: query.range,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddHistoryRequest {
    pub track: Option<Track>,
}

/// Record a play reported by the client
#[post("")]
pub async fn add_history(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<AddHistoryRequest>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::History, &client_key(&req))?;

    let track = body
        .into_inner()
        .track
        .ok_or_else(|| ApiError::field("track", "Track data is required"))?
        .normalized();
    if track.sid.trim().is_empty() {
        return Err(ApiError::field("track", "Track data is required"));
    }

    record_play(state.db.pool(), &session_id(&req), &track).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Track added to history",
        "track": track,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    pub scope: HistoryRange,
}

/// Clear history within a range (everything by default)
#[delete("")]
pub async fn clear_history(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ClearQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::History, &client_key(&req))?;

    let since = query.scope.cutoff(Utc::now());
    let deleted = HistoryTable::clear(state.db.pool(), &session_id(&req), since).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": format!("History cleared ({})", query.scope.as_str()),
        "deletedCount": deleted,
    })))
}

/// Configure history routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_history)
        .service(add_history)
        .service(clear_history);
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{test_app, test_state};
    use actix_web::test;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_add_then_list() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/api/music/history")
                .set_json(json!({"track": {"source": "deezer", "sid": "7", "title": "Seven"}}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 201);
        }

        let req = test::TestRequest::get()
            .uri("/api/music/history?range=7d")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pagination"]["total"], 2);
        assert_eq!(body["range"], "7d");
        assert_eq!(body["history"][0]["title"], "Seven");

        let req = test::TestRequest::get()
            .uri("/api/music/history?unique=true&limit=500")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["unique"], true);
        assert_eq!(body["pagination"]["limit"], 200);
        assert_eq!(body["history"][0]["playCount"], 2);

        let req = test::TestRequest::delete().uri("/api/music/history").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["deletedCount"], 2);
    }

    #[actix_web::test]
    async fn test_page_out_of_range() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/music/history?page=9223372036854775807&limit=50")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["field"], "page");

        // far past the end, but representable: just empty
        let req = test::TestRequest::get()
            .uri("/api/music/history?page=1000000")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["history"].as_array().unwrap().len(), 0);
        assert_eq!(body["pagination"]["page"], 1000000);
    }

    #[actix_web::test]
    async fn test_add_requires_track() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/history")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
