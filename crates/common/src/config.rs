//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CorpusError, CorpusResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory holding the corpus subdirectories.
    pub data_dir: PathBuf,

    /// Corpus layout and read settings.
    pub corpus: CorpusSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where shards live and how they are read and written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Subdirectory of `data_dir` containing the source shards.
    pub input_subdir: String,

    /// Subdirectory of `data_dir` receiving edited shards.
    pub output_subdir: String,

    /// Appended to a shard's file stem when writing its edited copy.
    pub output_suffix: String,

    /// Rows per record batch when reading and writing shards.
    pub read_batch_size: usize,

    /// Emit a progress event every N batches.
    pub progress_every_batches: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "corpusedit_dataset=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            corpus: CorpusSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            input_subdir: "long_audio".to_string(),
            output_subdir: "long_audio_edited".to_string(),
            output_suffix: "_edited".to_string(),
            read_batch_size: 1000,
            progress_every_batches: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> CorpusResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject settings the loader cannot work with.
    pub fn validate(&self) -> CorpusResult<()> {
        if self.corpus.read_batch_size == 0 {
            return Err(CorpusError::config("read_batch_size must be at least 1"));
        }
        if self.corpus.input_subdir == self.corpus.output_subdir {
            return Err(CorpusError::config(
                "output_subdir must differ from input_subdir",
            ));
        }
        Ok(())
    }

    /// Directory containing the source shards.
    pub fn input_dir(&self) -> PathBuf {
        self.data_dir.join(&self.corpus.input_subdir)
    }

    /// Directory receiving edited shards.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join(&self.corpus.output_subdir)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("corpusedit").join("config.json")
}
