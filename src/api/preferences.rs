//! Player preferences API routes

use actix_web::{get, put, web, HttpRequest, HttpResponse};

use super::{session_id, AppState};
use crate::error::ApiResult;
use crate::models::PlayerPreferences;

#[get("")]
pub async fn get_preferences(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let session = state.sessions.get_or_create(&session_id(&req)).await;
    let prefs = session.lock().await.driver().store().preferences();
    Ok(HttpResponse::Ok().json(prefs))
}

/// Replace all preferences at once; missing fields take their defaults
#[put("")]
pub async fn update_preferences(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PlayerPreferences>,
) -> ApiResult<HttpResponse> {
    let session = state.sessions.get_or_create(&session_id(&req)).await;
    let mut guard = session.lock().await;
    // queued behind any earlier saves for this session
    guard.store_mut().set_preferences(body.into_inner());
    let prefs = guard.driver().store().preferences();

    Ok(HttpResponse::Ok().json(prefs))
}

/// Configure preferences routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_preferences).service(update_preferences);
}
