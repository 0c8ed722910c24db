//! Error types for save/load operations

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::types::Tick;

/// Boxed failure cause reported by a serializer collaborator
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, SaveError>;

#[derive(Error, Debug)]
pub enum SaveError {
    /// Nickname is blank or contains characters a file name cannot hold
    #[error("Invalid nickname {nickname:?}: {reason}")]
    InvalidNickname {
        nickname: String,
        reason: &'static str,
    },

    /// Extension does not start with '.' or contains unsupported characters
    #[error("Invalid file extension {extension:?}: {reason}")]
    InvalidExtension {
        extension: String,
        reason: &'static str,
    },

    /// File name does not follow `{nickname}_{ticks}{extension}`
    #[error("File name {file_name:?} is not a save file name")]
    Format { file_name: String },

    #[error("Save file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The slot has no saves on disk
    #[error("No save file exists for nickname {nickname:?}")]
    NoSaveFile { nickname: String },

    #[error("Save file already exists: {}", path.display())]
    DuplicateFile { path: PathBuf },

    /// Throttle rejected a save that came too soon after the previous one
    #[error("Save to {nickname:?} at tick {now} is too soon after tick {last} (re-save delay {delay:?})")]
    ReSaveTooSoon {
        nickname: String,
        last: Tick,
        now: Tick,
        delay: Duration,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[source]
        source: BoxError,
    },

    #[error("Deserialization error in {}: {source}", path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),
}

impl SaveError {
    /// True for a missing file as well as an empty slot
    pub fn is_not_found(&self) -> bool {
        matches!(self, SaveError::NotFound { .. } | SaveError::NoSaveFile { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SaveError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal failure to delete a backup beyond the retention cap
///
/// Reported alongside a successful save; it never fails the save itself.
#[derive(Error, Debug)]
#[error("Could not trim backup {}: {source}", path.display())]
pub struct TrimWarning {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
