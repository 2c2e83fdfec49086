// Player configuration - stored as RON, every field optional

use crate::audio::engine::Volume;
use crate::sequencer::transport::DEFAULT_SEEK_LEAD_SECS;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Seconds the origin is moved back on seek so the target fires at once
    pub seek_lead_secs: f64,
    /// Volume multiplier applied to note velocities (0.0-1.0)
    pub initial_volume: f32,
    /// Start playing as soon as a piece is loaded
    pub autoplay: bool,
    pub command_capacity: usize,
    pub status_capacity: usize,
    pub notification_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            seek_lead_secs: DEFAULT_SEEK_LEAD_SECS,
            initial_volume: 1.0,
            autoplay: true,
            command_capacity: 64,
            status_capacity: 256,
            notification_capacity: 64,
        }
    }
}

impl PlayerConfig {
    /// `<config dir>/pianola/player.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pianola").join("player.ron"))
    }

    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        let config: PlayerConfig =
            ron::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_ron_str(&data)
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(data) => Self::from_ron_str(&data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.seek_lead_secs.is_finite() || self.seek_lead_secs <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "seek_lead_secs must be a positive number, got {}",
                self.seek_lead_secs
            )));
        }
        if self.command_capacity == 0
            || self.status_capacity == 0
            || self.notification_capacity == 0
        {
            return Err(ConfigError::Invalid(
                "channel capacities must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn volume(&self) -> Volume {
        Volume::new(self.initial_volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.seek_lead_secs, 0.1);
        assert_eq!(config.volume(), Volume::FULL);
        assert!(config.autoplay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = PlayerConfig::from_ron_str("(initial_volume: 0.5, autoplay: false)").unwrap();
        assert_eq!(config.initial_volume, 0.5);
        assert!(!config.autoplay);
        assert_eq!(config.command_capacity, 64);
    }

    #[test]
    fn test_volume_is_clamped() {
        let config = PlayerConfig::from_ron_str("(initial_volume: 3.0)").unwrap();
        assert_eq!(config.volume().get(), 1.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = PlayerConfig::from_ron_str("(seek_lead_secs: 0.0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PlayerConfig::from_ron_str("(status_capacity: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PlayerConfig::from_ron_str("(autoplay: maybe)").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("player.ron");

        let config = PlayerConfig {
            seek_lead_secs: 0.25,
            initial_volume: 0.7,
            ..PlayerConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(PlayerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlayerConfig::load_or_default(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, PlayerConfig::default());

        assert!(matches!(
            PlayerConfig::load(&dir.path().join("absent.ron")),
            Err(ConfigError::Io(_))
        ));
    }
}
