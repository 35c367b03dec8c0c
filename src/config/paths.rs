//! Path management for the hub
//!
//! Resolves the config directory once and hands out the files kept in it.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

static PATHS: OnceCell<Arc<Paths>> = OnceCell::new();

/// Manages all filesystem paths for the application
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
}

impl Paths {
    /// Initialize the paths singleton
    pub fn init(config: Option<PathBuf>) -> Result<Arc<Paths>> {
        let paths = PATHS.get_or_try_init(|| {
            let paths = Self::new(config)?;
            Ok::<_, anyhow::Error>(Arc::new(paths))
        })?;
        Ok(Arc::clone(paths))
    }

    /// Get the global paths instance
    pub fn get() -> Result<Arc<Paths>> {
        PATHS.get().map(Arc::clone).context("Paths not initialized")
    }

    /// Build paths rooted at an explicit directory, bypassing the singleton
    pub fn at(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let paths = Self {
            config_dir: config_dir.into(),
        };
        paths.create_directories()?;
        Ok(paths)
    }

    fn new(config_override: Option<PathBuf>) -> Result<Self> {
        let config_dir = match config_override {
            Some(path) => path,
            None => directories::ProjectDirs::from("", "", "musichub")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".musichub")),
        };

        Self::at(config_dir)
    }

    fn create_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory {}",
                self.config_dir.display()
            )
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// settings.json
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// SQLite database file
    pub fn app_db_path(&self) -> PathBuf {
        self.config_dir.join("musichub.db")
    }

    /// Optional station list overriding the built-in radio stations
    pub fn stations_path(&self) -> PathBuf {
        self.config_dir.join("stations.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_at_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("hub");
        let paths = Paths::at(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(paths.settings_path(), root.join("settings.json"));
        assert_eq!(paths.app_db_path(), root.join("musichub.db"));
        assert_eq!(paths.stations_path(), root.join("stations.json"));
    }
}
