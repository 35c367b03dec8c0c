//! Search API routes

use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::warn;

use super::{client_key, AppState};
use crate::core::{Route, SearchRequest};
use crate::db::TrackTable;
use crate::error::ApiResult;

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// Comma separated source list, e.g. `yt,sc,sp,dz,radio`
    pub sources: Option<String>,
    pub limit: Option<usize>,
}

/// Search every requested source
#[get("")]
pub async fn search(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Search, &client_key(&req))?;

    let request = SearchRequest::parse(
        query.q.as_deref(),
        query.sources.as_deref(),
        query.limit,
        &state.config,
    )?;
    let response = state.search.search(&request).await;

    // results become playable through /play
    if let Err(e) = TrackTable::upsert_many(state.db.pool(), response.tracks()).await {
        warn!("Failed to cache search results: {}", e);
    }

    Ok(HttpResponse::Ok().json(response))
}

/// Configure search routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(search);
}
