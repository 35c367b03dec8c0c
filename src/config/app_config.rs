//! Application configuration
//!
//! Layered as: built-in defaults, then `settings.json` in the config
//! directory, then `MUSICHUB_*` environment variables. Provider credentials
//! also honour their conventional variable names (`YOUTUBE_API_KEY`, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Paths;

/// Token bucket parameters for one route
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub max_tokens: f64,
    /// Tokens added per second
    pub refill_rate: f64,
}

impl BucketConfig {
    pub const fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            max_tokens,
            refill_rate,
        }
    }
}

/// Per-route rate limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimits {
    #[serde(default = "default_search_bucket")]
    pub search: BucketConfig,
    #[serde(default = "default_play_bucket")]
    pub play: BucketConfig,
    #[serde(default = "default_queue_bucket")]
    pub queue: BucketConfig,
    #[serde(default = "default_history_bucket")]
    pub history: BucketConfig,
    /// Favorites and playlists
    #[serde(default = "default_library_bucket")]
    pub library: BucketConfig,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            search: default_search_bucket(),
            play: default_play_bucket(),
            queue: default_queue_bucket(),
            history: default_history_bucket(),
            library: default_library_bucket(),
        }
    }
}

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// YouTube Data API key
    #[serde(default)]
    pub youtube_api_key: String,

    /// Spotify client-credentials pair
    #[serde(default)]
    pub spotify_client_id: String,
    #[serde(default)]
    pub spotify_client_secret: String,

    /// SoundCloud API client id
    #[serde(default)]
    pub soundcloud_client_id: String,

    /// Market passed to providers that localise results
    #[serde(default = "default_market")]
    pub market: String,

    /// Timeout applied to every provider request
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for stream liveness checks
    #[serde(default = "default_stream_check_timeout")]
    pub stream_check_timeout_secs: u64,

    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,

    #[serde(default = "default_max_search_limit")]
    pub max_search_limit: usize,

    /// Sources searched when a request names none
    #[serde(default = "default_sources")]
    pub default_sources: String,

    /// Listening history older than this is pruned
    #[serde(default = "default_history_retention")]
    pub history_retention_days: i64,

    #[serde(default)]
    pub rate_limits: RateLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: String::new(),
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            soundcloud_client_id: String::new(),
            market: default_market(),
            http_timeout_secs: default_http_timeout(),
            stream_check_timeout_secs: default_stream_check_timeout(),
            default_search_limit: default_search_limit(),
            max_search_limit: default_max_search_limit(),
            default_sources: default_sources(),
            history_retention_days: default_history_retention(),
            rate_limits: RateLimits::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from settings.json and the environment
    pub fn load(paths: &Paths) -> Result<Self> {
        let settings_path = paths.settings_path();

        if !settings_path.exists() {
            Self::default().save(paths)?;
        }

        let settings = config::Config::builder()
            .add_source(
                config::Config::try_from(&Self::default())
                    .context("Failed to build default settings")?,
            )
            .add_source(
                config::File::from(settings_path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("MUSICHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("youtube_api_key", env_credential("YOUTUBE_API_KEY"))?
            .set_override_option("spotify_client_id", env_credential("SPOTIFY_CLIENT_ID"))?
            .set_override_option(
                "spotify_client_secret",
                env_credential("SPOTIFY_CLIENT_SECRET"),
            )?
            .set_override_option(
                "soundcloud_client_id",
                env_credential("SOUNDCLOUD_CLIENT_ID"),
            )?
            .build()
            .context("Failed to load settings")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Failed to parse settings")?;

        Ok(config.validated())
    }

    /// Save configuration to settings.json
    pub fn save(&self, paths: &Paths) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(paths.settings_path(), content).context("Failed to write settings file")?;
        Ok(())
    }

    fn validated(mut self) -> Self {
        if self.max_search_limit == 0 {
            self.max_search_limit = default_max_search_limit();
        }
        self.default_search_limit = self.default_search_limit.clamp(1, self.max_search_limit);
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_http_timeout();
        }
        if self.stream_check_timeout_secs == 0 {
            self.stream_check_timeout_secs = default_stream_check_timeout();
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn stream_check_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_check_timeout_secs)
    }

    /// Clamp a requested search limit into the configured range
    pub fn search_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_search_limit)
            .clamp(1, self.max_search_limit)
    }
}

fn env_credential(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// Default value functions for serde

fn default_market() -> String {
    "US".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_stream_check_timeout() -> u64 {
    5
}

fn default_search_limit() -> usize {
    20
}

fn default_max_search_limit() -> usize {
    50
}

fn default_sources() -> String {
    "yt,sc,sp,dz,radio".to_string()
}

fn default_history_retention() -> i64 {
    365
}

fn default_search_bucket() -> BucketConfig {
    BucketConfig::new(30.0, 0.5)
}

fn default_play_bucket() -> BucketConfig {
    BucketConfig::new(60.0, 1.0)
}

fn default_queue_bucket() -> BucketConfig {
    BucketConfig::new(100.0, 2.0)
}

fn default_history_bucket() -> BucketConfig {
    BucketConfig::new(100.0, 2.0)
}

fn default_library_bucket() -> BucketConfig {
    BucketConfig::new(100.0, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_search_limit, 20);
        assert_eq!(config.max_search_limit, 50);
        assert_eq!(config.rate_limits.search, BucketConfig::new(30.0, 0.5));
        assert!(config.youtube_api_key.is_empty());
    }

    #[test]
    fn test_search_limit_clamps() {
        let config = AppConfig::default();
        assert_eq!(config.search_limit(None), 20);
        assert_eq!(config.search_limit(Some(500)), 50);
        assert_eq!(config.search_limit(Some(0)), 1);
    }

    #[test]
    fn test_load_reads_settings_file() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Paths::at(tmp.path()).unwrap();
        std::fs::write(
            paths.settings_path(),
            r#"{"market": "DE", "http_timeout_secs": 3, "default_search_limit": 80}"#,
        )
        .unwrap();

        let config = AppConfig::load(&paths).unwrap();
        assert_eq!(config.market, "DE");
        assert_eq!(config.http_timeout(), Duration::from_secs(3));
        // clamped to the max limit
        assert_eq!(config.default_search_limit, 50);
    }

    #[test]
    fn test_load_writes_defaults_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Paths::at(tmp.path()).unwrap();
        let config = AppConfig::load(&paths).unwrap();
        assert!(paths.settings_path().exists());
        assert_eq!(config.default_sources, "yt,sc,sp,dz,radio");
    }
}
