//! The config module
//! Provide TOML configuration with defaults for every field
//!
//! A missing file is not an error: `load` falls back to `Config::default()`,
//! and a partial file only overrides the keys it names.

use crate::encoder::UnseenPolicy;
use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub roster: RosterConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API binds to
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// CSV file with columns name, agency, location, genres, website
    pub path: PathBuf,
    /// Separator inside the genres cell
    pub genre_delimiter: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the fitted snapshot is persisted
    pub artifact_path: PathBuf,
    /// Handling of query labels never seen in the roster
    pub unseen: UnseenPolicy,
    /// Result count when a request does not name one
    pub default_top_n: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1:8000".to_string() }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("literary_agents.csv"),
            genre_delimiter: ',',
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("agent_recommender_model.bin"),
            unseen: UnseenPolicy::Ignore,
            default_top_n: 3,
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| RecommendError::Config(format!("reading {}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| RecommendError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    /// Write current config to disk (for `litrec init`).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RecommendError::Config(e.to_string()))?;
        std::fs::write(path, contents)
            .map_err(|e| RecommendError::Config(format!("writing {}: {}", path.display(), e)))
    }
}
