//! Configuration persistence for panotrack settings
//!
//! Annotations themselves are never persisted; only display preferences
//! survive between sessions. Missing or unreadable config falls back to
//! defaults with a warning, never an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Rgb, VelocityUnit};

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanotrackConfig {
    /// Color for measurement lines
    pub line_color: Rgb,
    /// Color for the tracked COM path
    pub path_color: Rgb,
    /// Whether distance labels are drawn for new lines
    pub show_distances: bool,
    /// Edge of the square sampled around the cursor, in display pixels
    pub magnifier_size: u32,
    /// Unit for velocity readouts
    pub velocity_unit: VelocityUnit,
    /// Target delay between playback frames in milliseconds
    pub playback_delay_ms: u64,
}

impl Default for PanotrackConfig {
    fn default() -> Self {
        Self {
            line_color: Rgb::WHITE,
            path_color: Rgb::WHITE,
            show_distances: true,
            magnifier_size: 40,
            velocity_unit: VelocityUnit::default(),
            playback_delay_ms: 30,
        }
    }
}

impl PanotrackConfig {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("panotrack").join("config.json"))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring corrupt config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("no config directory available"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!("config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PanotrackConfig::default();
        config.magnifier_size = 80;
        config.velocity_unit = VelocityUnit::MilesPerHour;
        config.line_color = Rgb::new(0.9, 0.1, 0.1);
        config.save_to(&path).unwrap();

        assert_eq!(PanotrackConfig::load_from(&path), config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PanotrackConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(config, PanotrackConfig::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(PanotrackConfig::load_from(&path), PanotrackConfig::default());
    }
}
