//! REST API routes for musichub

pub mod discover;
pub mod favorites;
pub mod health;
pub mod history;
pub mod play;
pub mod playlists;
pub mod preferences;
pub mod queue;
pub mod radio;
pub mod search;

use actix_web::{web, HttpRequest};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::session::DEFAULT_SESSION;
use crate::core::{PlaybackResolver, RateLimiter, SearchService, SessionRegistry};
use crate::db::DbEngine;
use crate::error::ApiError;
use crate::sources::Providers;

/// Header carrying the player session a request belongs to
pub const SESSION_HEADER: &str = "X-Session-Id";

const MAX_SESSION_ID_LEN: usize = 64;

/// Shared state handed to every handler
pub struct AppState {
    pub config: AppConfig,
    pub db: DbEngine,
    pub providers: Providers,
    pub search: SearchService,
    pub resolver: PlaybackResolver,
    pub sessions: SessionRegistry,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbEngine, providers: Providers) -> Self {
        let registry = providers.registry();
        let resolver = PlaybackResolver::new(registry.clone());
        let sessions = SessionRegistry::new(resolver.clone(), Some(db.pool().clone()));
        let limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));

        Self {
            search: SearchService::new(registry),
            resolver,
            sessions,
            limiter,
            config,
            db,
            providers,
        }
    }
}

/// Rate limit key for a request
pub(crate) fn client_key(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// Session id from the request header, falling back to the shared session
pub(crate) fn session_id(req: &HttpRequest) -> String {
    req.headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_SESSION_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

/// Body and query errors use the same envelope as every other error
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(1 << 20)
        .error_handler(|err, _req| ApiError::validation(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::validation(err.to_string()).into())
}

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/music")
            // Search routes
            .service(web::scope("/search").configure(search::configure))
            // Playback resolution
            .service(web::scope("/play").configure(play::configure))
            // Radio stations
            .service(web::scope("/radio").configure(radio::configure))
            // Player queue and media events
            .service(web::scope("/queue").configure(queue::configure))
            // Listening history
            .service(web::scope("/history").configure(history::configure))
            // Player preferences
            .service(web::scope("/preferences").configure(preferences::configure))
            // Favorites and user playlists
            .service(web::scope("/favorites").configure(favorites::configure))
            .service(web::scope("/playlists").configure(playlists::configure))
            // Charts and trending
            .configure(discover::configure)
            .configure(health::configure),
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::engine::testing::temp_engine;
    use crate::models::default_stations;
    use tempfile::TempDir;

    /// App state with no provider credentials and a throwaway database
    pub async fn test_state() -> (web::Data<AppState>, TempDir) {
        test_state_with(AppConfig::default()).await
    }

    pub async fn test_state_with(config: AppConfig) -> (web::Data<AppState>, TempDir) {
        let (db, dir) = temp_engine().await;
        let providers = Providers::from_config(&config, default_stations()).unwrap();
        (web::Data::new(AppState::new(config, db, providers)), dir)
    }

    /// Initialised service with every route and the error envelope configs
    macro_rules! test_app {
        ($state:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data($state)
                    .app_data($crate::api::json_config())
                    .app_data($crate::api::query_config())
                    .configure($crate::api::configure),
            )
            .await
        };
    }
    pub(crate) use test_app;
}
