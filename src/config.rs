//! Configuration for cursor-fingerprint.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding `user<ID>/` session folders
    pub input_dir: PathBuf,

    /// Directory receiving per-user and global score files
    pub score_dir: PathBuf,

    /// Path for storing the run ledger
    pub data_path: PathBuf,

    /// Worker threads for batch processing (0 = one per CPU)
    pub workers: usize,

    /// Append the user id as a trailing column of every score row
    pub emit_user_id: bool,

    /// File name of the score file shared by all users
    pub global_score_file: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cursor-fingerprint");

        Self {
            input_dir: PathBuf::from("training_files"),
            score_dir: PathBuf::from("score"),
            data_path: data_dir,
            workers: 0,
            emit_user_id: false,
            global_score_file: "score.csv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cursor-fingerprint")
            .join("config.json")
    }

    /// Path of the persisted run ledger.
    pub fn run_log_path(&self) -> PathBuf {
        self.data_path.join("run_log.json")
    }

    /// Number of worker threads to start.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.score_dir)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.global_score_file, "score.csv");
        assert_eq!(config.score_dir, PathBuf::from("score"));
        assert!(!config.emit_user_id);
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{ "workers": 3 }"#).unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.effective_workers(), 3);
        assert_eq!(config.global_score_file, "score.csv");
    }

    #[test]
    fn test_run_log_path() {
        let config = Config {
            data_path: PathBuf::from("/tmp/cf"),
            ..Config::default()
        };
        assert_eq!(config.run_log_path(), PathBuf::from("/tmp/cf/run_log.json"));
    }
}
