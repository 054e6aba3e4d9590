//! Configuration for the emotion engine.

use crate::core::engine::EngineConfig;
use crate::core::score::ScoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Directory name used under the platform config and data dirs.
pub const APP_DIR: &str = "synheart-emotion-engine";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Buffering and confidence gating
    pub engine: EngineConfig,

    /// Score fusion weights and plausibility ranges
    pub score: ScoreConfig,

    /// Model artifact to load; the embedded model is used when unset
    pub model_path: Option<PathBuf>,

    /// Path for consent, session and transparency files
    pub data_path: PathBuf,

    /// How often results are drained and scored
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            engine: EngineConfig::default(),
            score: ScoreConfig::default(),
            model_path: None,
            data_path: data_dir,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }

    pub fn consent_path(&self) -> PathBuf {
        self.data_path.join("consent.json")
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.data_path.join("sessions.json")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.window_size, 60);
        assert_eq!(config.engine.min_buffer_size, 10);
        assert_eq!(config.engine.max_buffer_size, 300);
        assert_eq!(config.engine.confidence_threshold, 0.6);
        assert_eq!(config.score.hrv_min, 20.0);
        assert_eq!(config.score.hr_max, 200.0);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"engine": {"confidence_threshold": 0.75}, "tick_interval": 500}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.engine.confidence_threshold, 0.75);
        assert_eq!(config.engine.window_size, 60);
        assert_eq!(config.score.weight_hrv, 0.5);
        assert_eq!(config.tick_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("synheart-emotion-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config.engine.window_size = 30;
        config.model_path = Some(PathBuf::from("/opt/models/emotion.json"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.engine.window_size, 30);
        assert_eq!(loaded.model_path, config.model_path);

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("synheart-emotion-no-config.json");
        let _ = std::fs::remove_file(&path);
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }
}
