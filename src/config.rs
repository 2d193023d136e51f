use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants::{DEFAULT_HIGH_SCORE_PATH, HIGH_SCORE_PATH_ENV};
use crate::types::{ConfigError, GameConfig};

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] ConfigError),
}

/// Reads a JSON `GameConfig`; missing keys keep their defaults. Without a
/// path the defaults are used as-is.
pub fn load_game_config(path: Option<&Path>) -> Result<GameConfig, ConfigLoadError> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str::<GameConfig>(&text).map_err(|source| ConfigLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => GameConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Explicit flag, then the environment, then `highscore.txt`.
pub fn resolve_high_score_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var(HIGH_SCORE_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HIGH_SCORE_PATH))
}
