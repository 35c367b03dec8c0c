//! Persisted player preferences

use serde::{Deserialize, Serialize};

use super::RepeatMode;

/// The only part of the player state that survives a reload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPreferences {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_true")]
    pub autoplay: bool,
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            repeat_mode: RepeatMode::Off,
            shuffle: false,
            autoplay: true,
        }
    }
}

impl PlayerPreferences {
    /// Clamp out-of-range values coming from storage or clients
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
        self
    }
}

fn default_volume() -> f32 {
    0.8
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let prefs: PlayerPreferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, PlayerPreferences::default());
        assert!(prefs.autoplay);
    }

    #[test]
    fn test_sanitized_clamps_volume() {
        let prefs = PlayerPreferences {
            volume: 3.5,
            ..Default::default()
        };
        assert_eq!(prefs.sanitized().volume, 1.0);
    }
}
