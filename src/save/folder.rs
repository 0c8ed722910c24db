//! Save folder enumeration

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::codec;
use super::error::{Result, SaveError};
use super::file::{SaveBackend, SaveFile};
use super::types::SaveIdentity;

/// A directory holding the save files of one context
///
/// All nicknames of a context share the folder; each nickname's history is
/// picked out by file name.
pub struct SaveFolder<T> {
    directory: PathBuf,
    backend: SaveBackend<T>,
}

impl<T> SaveFolder<T> {
    pub fn new(directory: impl Into<PathBuf>, backend: SaveBackend<T>) -> Self {
        SaveFolder {
            directory: directory.into(),
            backend,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn backend(&self) -> &SaveBackend<T> {
        &self.backend
    }

    /// A theoretical file in this folder; does not touch the disk
    pub fn file_for(&self, identity: SaveIdentity) -> SaveFile<T> {
        SaveFile::new(identity, &self.directory, self.backend.clone())
    }

    /// Lists the saves of `nickname`, oldest first by encoded tick
    ///
    /// A missing directory gives an empty list. Names that do not decode, or
    /// that decode to a different nickname or extension (`Slot_*` also
    /// matches `Slot_7_…`), are skipped as foreign files. The result is a
    /// snapshot; call again to re-scan.
    pub fn enumerate_save_files(&self, nickname: &str, extension: &str) -> Result<Vec<SaveFile<T>>> {
        let pattern = codec::search_pattern(nickname, extension);
        let paths = self
            .backend
            .filesystem
            .list_files(&self.directory, &pattern)
            .map_err(|e| SaveError::io(&self.directory, e))?;

        let mut found: Vec<(SaveIdentity, PathBuf)> = paths
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                match codec::decode(name) {
                    Ok(identity) => Some((identity, path)),
                    Err(_) => {
                        debug!("Ignoring foreign file {} in save folder", name);
                        None
                    }
                }
            })
            .filter(|(identity, _)| identity.nickname() == nickname && identity.extension() == extension)
            .collect();

        // Equal ticks (`_5` next to `_05`) fall back to the listed name
        found.sort_by(|(a, a_path), (b, b_path)| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| a_path.file_name().cmp(&b_path.file_name()))
        });

        Ok(found
            .into_iter()
            .map(|(identity, path)| SaveFile::at(identity, path, self.backend.clone()))
            .collect())
    }
}

impl<T> Clone for SaveFolder<T> {
    fn clone(&self) -> Self {
        SaveFolder {
            directory: self.directory.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<T> fmt::Debug for SaveFolder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveFolder")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}
