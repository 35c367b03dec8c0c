//! Radio station API routes

use actix_web::{get, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::{RadioStation, Track};

#[derive(Debug, Deserialize)]
pub struct RadioQuery {
    pub genre: Option<String>,
    pub country: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StationsResponse {
    pub stations: Vec<Track>,
    pub total: usize,
}

/// List stations as playable tracks
#[get("")]
pub async fn get_stations(
    state: web::Data<AppState>,
    query: web::Query<RadioQuery>,
) -> impl Responder {
    let radio = &state.providers.radio;

    let mut stations = radio.search_stations(query.q.as_deref().unwrap_or_default());
    if let Some(genre) = query.genre.as_deref() {
        let wanted = radio.by_genre(genre);
        stations.retain(|s| wanted.contains(s));
    }
    if let Some(country) = query.country.as_deref() {
        let wanted = radio.by_country(country);
        stations.retain(|s| wanted.contains(s));
    }

    let stations: Vec<Track> = stations.into_iter().map(RadioStation::to_track).collect();
    HttpResponse::Ok().json(StationsResponse {
        total: stations.len(),
        stations,
    })
}

#[get("/genres")]
pub async fn get_genres(state: web::Data<AppState>) -> impl Responder {
    let genres = state.providers.radio.genres();
    HttpResponse::Ok().json(serde_json::json!({
        "total": genres.len(),
        "genres": genres,
    }))
}

/// Configure radio routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_stations).service(get_genres);
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{test_app, test_state};
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn test_station_filters() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/api/music/radio").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 5);
        assert_eq!(body["stations"][0]["source"], "radio");

        let req = test::TestRequest::get()
            .uri("/api/music/radio?country=germany")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 2);

        let req = test::TestRequest::get()
            .uri("/api/music/radio?country=germany&genre=rock")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["stations"][0]["title"], "Classic Rock");
    }

    #[actix_web::test]
    async fn test_genres_sorted() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/music/radio/genres")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 5);
        assert_eq!(body["genres"][0], "Chillhop");
    }
}
