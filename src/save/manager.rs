//! Save manager for one save context
//!
//! This module provides the SaveManager struct which handles:
//! - Locating the save folder (`{data root}/SaveData/{context}/`)
//! - Handing out slots by nickname, including the auto-save slot
//! - Sharing one settings chain and backend across those slots

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{Result, SaveError};
use super::file::SaveBackend;
use super::folder::SaveFolder;
use super::settings::SaveManagerSettings;
use super::slot::SaveSlot;

/// Name of the directory under the data root that holds every context
pub const SAVE_DATA_DIR: &str = "SaveData";

pub struct SaveManager<T> {
    context_name: String,
    folder: SaveFolder<T>,
    settings: Arc<SaveManagerSettings>,
}

impl<T> SaveManager<T> {
    /// Creates a manager rooted at `data_root`
    ///
    /// Performs no I/O; the save folder is created by the first save.
    pub fn new(
        data_root: impl AsRef<Path>,
        context_name: impl Into<String>,
        backend: SaveBackend<T>,
        settings: Arc<SaveManagerSettings>,
    ) -> Result<Self> {
        let context_name = context_name.into();
        validate_context_name(&context_name)?;

        let directory = data_root.as_ref().join(SAVE_DATA_DIR).join(&context_name);
        Ok(SaveManager {
            context_name,
            folder: SaveFolder::new(directory, backend),
            settings,
        })
    }

    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    pub fn folder(&self) -> &SaveFolder<T> {
        &self.folder
    }

    pub fn save_directory(&self) -> &Path {
        self.folder.directory()
    }

    pub fn settings(&self) -> &Arc<SaveManagerSettings> {
        &self.settings
    }

    /// The slot for `nickname`. No I/O.
    pub fn slot(&self, nickname: &str) -> Result<SaveSlot<T>> {
        SaveSlot::new(nickname, self.folder.clone(), Arc::clone(&self.settings))
    }

    /// The slot named by the `auto_save_nickname` setting
    pub fn auto_save_slot(&self) -> Result<SaveSlot<T>> {
        self.slot(&self.settings.auto_save_nickname())
    }
}

impl<T> SaveManager<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    /// JSON saves under the platform data directory
    ///
    /// Uses `dirs::data_dir()` (e.g. `~/.local/share` on Linux), or the
    /// current directory when the platform has none.
    pub fn with_default_root(
        context_name: impl Into<String>,
        settings: Arc<SaveManagerSettings>,
    ) -> Result<Self> {
        let backend = SaveBackend::json().with_options(settings.serializer_options());
        Self::new(default_data_root(), context_name, backend, settings)
    }
}

/// The platform data directory, or `.` when there is none
pub fn default_data_root() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn validate_context_name(context_name: &str) -> Result<()> {
    // Same rules as a nickname: it becomes a single directory entry
    super::codec::validate_nickname(context_name).map_err(|_| SaveError::InvalidNickname {
        nickname: context_name.to_string(),
        reason: "context name is not a valid directory name",
    })?;
    if context_name == "." || context_name == ".." {
        return Err(SaveError::InvalidNickname {
            nickname: context_name.to_string(),
            reason: "context name is not a valid directory name",
        });
    }
    Ok(())
}

impl<T> std::fmt::Debug for SaveManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveManager")
            .field("context_name", &self.context_name)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}
