use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::json;
use thiserror::Error;

use crate::log;

#[derive(Debug, Error)]
pub enum ScoreStoreError {
    #[error("failed to create parent dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Durable best score. The file holds a single decimal integer.
///
/// A store without a path keeps the score in memory only, which is what the
/// simulator and tests use when nothing should touch the disk.
#[derive(Debug)]
pub struct ScoreStore {
    file_path: Option<PathBuf>,
    best: u32,
}

impl ScoreStore {
    pub fn open(file_path: PathBuf) -> Self {
        let best = load_high_score(&file_path);
        Self {
            file_path: Some(file_path),
            best,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            best: 0,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Best score known to this process.
    pub fn best(&self) -> u32 {
        self.best
    }

    /// Re-reads the stored value. Never fails; unreadable storage reads as 0.
    pub fn load(&self) -> u32 {
        match &self.file_path {
            Some(path) => load_high_score(path),
            None => self.best,
        }
    }

    /// Records `candidate` when it beats the best score. Returns whether it
    /// did. The in-memory value is updated even if the write fails, so the
    /// running game keeps an accurate high score.
    pub fn commit_if_greater(&mut self, candidate: u32) -> Result<bool, ScoreStoreError> {
        if candidate <= self.best {
            return Ok(false);
        }
        self.best = candidate;
        if let Some(path) = &self.file_path {
            write_durably(path, candidate)?;
        }
        Ok(true)
    }
}

pub fn parse_high_score(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse::<u32>().ok()
}

fn load_high_score(path: &Path) -> u32 {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != io::ErrorKind::NotFound {
                log::warn(
                    "high_score_read_failed",
                    json!({ "path": path.display().to_string(), "error": error.to_string() }),
                );
            }
            return 0;
        }
    };
    match parse_high_score(&text) {
        Some(value) => value,
        None => {
            log::warn(
                "high_score_corrupt",
                json!({ "path": path.display().to_string(), "content": text.trim() }),
            );
            0
        }
    }
}

/// Writes through a sibling temp file and renames it over the target, so a
/// crash leaves either the old or the new value, never a torn one.
fn write_durably(path: &Path, value: u32) -> Result<(), ScoreStoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ScoreStoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let write_err = |source| ScoreStoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = File::create(&tmp_path).map_err(write_err)?;
    file.write_all(value.to_string().as_bytes())
        .map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}
