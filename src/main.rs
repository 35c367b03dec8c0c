//! musichub - one search box and one player over several music providers
//!
//! Fans searches out to YouTube, YouTube Music, SoundCloud, Spotify, Deezer
//! and internet radio, normalizes the results, works out how each track can
//! be played and hosts the player queue the web client mirrors.

mod api;
mod config;
mod core;
mod db;
mod error;
mod models;
mod sources;
mod stores;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// musichub - multi-source music hub
#[derive(Parser, Debug)]
#[command(name = "musichub")]
#[command(version)]
#[command(about = "Unified search, playback resolution and queue state over several music providers")]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Enable debug mode
    #[arg(long)]
    debug: bool,

    /// Path to config directory
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // initialize logging with filters to suppress noisy dependency output
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{},sqlx=warn,hyper=warn,reqwest=warn",
            log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("musichub v{} starting...", env!("CARGO_PKG_VERSION"));

    // Initialize paths
    let paths = config::Paths::init(args.config)?;
    info!("Config directory: {:?}", paths.config_dir());

    start_musichub(args.host, args.port, &paths).await
}

async fn start_musichub(host: String, port: u16, paths: &config::Paths) -> Result<()> {
    use crate::api::AppState;
    use crate::core::crons::{start_cron_jobs, Housekeeping};
    use crate::sources::{load_stations, Providers};

    let app_config = config::AppConfig::load(paths)?;
    log_missing_credentials(&app_config);

    // Setup database
    let db = db::setup_sqlite(&paths.app_db_path()).await?;

    let stations = load_stations(&paths.stations_path());
    info!("Loaded {} radio stations", stations.len());

    let providers = Providers::from_config(&app_config, stations)?;
    let state = actix_web::web::Data::new(AppState::new(app_config, db, providers));

    // Start background tasks
    info!("Starting background tasks...");
    start_cron_jobs(Housekeeping {
        db: state.db.clone(),
        limiter: Arc::clone(&state.limiter),
        sessions: state.sessions.clone(),
        history_retention_days: state.config.history_retention_days,
    });

    // Start the server
    let addr = format!("{}:{}", host, port);
    info!("Server listening on http://{}", addr);

    use actix_cors::Cors;
    use actix_web::{middleware, App, HttpServer};

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .app_data(state.clone())
            .app_data(api::json_config())
            .app_data(api::query_config())
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

/// Providers without credentials still answer, just with empty results
fn log_missing_credentials(config: &config::AppConfig) {
    if config.youtube_api_key.is_empty() {
        tracing::warn!("YOUTUBE_API_KEY not set; YouTube and YouTube Music searches will be empty");
    }
    if config.spotify_client_id.is_empty() || config.spotify_client_secret.is_empty() {
        tracing::warn!("Spotify credentials not set; Spotify searches will be empty");
    }
    if config.soundcloud_client_id.is_empty() {
        tracing::warn!("SOUNDCLOUD_CLIENT_ID not set; SoundCloud searches will be empty");
    }
}
