//! Health check route

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use super::AppState;

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let sources: Vec<_> = state
        .providers
        .registry()
        .sources()
        .into_iter()
        .map(|source| json!({"id": source, "name": source.display_name()}))
        .collect();

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": sources,
        "sessions": state.sessions.len(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{test_app, test_state};
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn test_health_lists_sources() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/api/music/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sources"].as_array().unwrap().len(), 6);
        assert_eq!(body["sources"][0]["id"], "youtube");
        assert_eq!(body["sources"][0]["name"], "YouTube");
    }
}
