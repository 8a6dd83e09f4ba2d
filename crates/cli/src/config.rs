use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use facewatch_core::detection::infrastructure::onnx_yolo_locator::DEFAULT_CONFIDENCE;
use facewatch_core::shared::constants::{DEFAULT_MATCH_THRESHOLD, DEFAULT_POLL_INTERVAL_MS};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Where detection results go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per tick on stdout.
    Json,
    /// Human-readable summary through the logger.
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub match_threshold: f64,
    pub poll_interval_ms: u64,
    pub detection_confidence: f64,
    pub recognition: bool,
    pub known_faces_dir: Option<PathBuf>,
    pub attribute_model: Option<PathBuf>,
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            detection_confidence: DEFAULT_CONFIDENCE,
            recognition: true,
            known_faces_dir: None,
            attribute_model: None,
            output: OutputFormat::Log,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceWatch").join("config.json"))
    }

    /// Reads the config at `path`. A missing file yields the defaults, and
    /// fields absent from the file keep their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.match_threshold.is_finite() || self.match_threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "Match threshold must be a positive number, got {}",
                self.match_threshold
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Poll interval must be at least 1 ms".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            )));
        }
        Ok(())
    }
}
