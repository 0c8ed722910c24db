//! A single versioned save file
//!
//! A [`SaveFile`] is cheap to create: it only binds an identity to a path.
//! Nothing touches the disk until [`SaveFile::save`] or [`SaveFile::load`]
//! is called, and [`SaveFile::exists`] asks the filesystem every time.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{Result, SaveError};
use super::filesystem::{FileSystem, StdFileSystem};
use super::serializer::{JsonSerializer, PayloadSerializer, SerializerOptions};
use super::types::{DuplicateFileResolution, SaveIdentity, Tick, WriteOutcome};

/// The collaborators a save file needs to reach the disk
pub struct SaveBackend<T> {
    pub filesystem: Arc<dyn FileSystem>,
    pub serializer: Arc<dyn PayloadSerializer<T>>,
    pub options: SerializerOptions,
}

impl<T> SaveBackend<T> {
    pub fn new(
        filesystem: Arc<dyn FileSystem>,
        serializer: Arc<dyn PayloadSerializer<T>>,
        options: SerializerOptions,
    ) -> Self {
        SaveBackend {
            filesystem,
            serializer,
            options,
        }
    }

    /// Same collaborators, different serializer options
    pub fn with_options(&self, options: SerializerOptions) -> Self {
        SaveBackend {
            options,
            ..self.clone()
        }
    }
}

impl<T> SaveBackend<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    /// JSON payloads on the real filesystem
    pub fn json() -> Self {
        SaveBackend::new(
            Arc::new(StdFileSystem),
            Arc::new(JsonSerializer),
            SerializerOptions::default(),
        )
    }

    /// JSON payloads on a caller-supplied filesystem
    pub fn json_on(filesystem: Arc<dyn FileSystem>) -> Self {
        SaveBackend::new(filesystem, Arc::new(JsonSerializer), SerializerOptions::default())
    }
}

// Derived Clone would needlessly require T: Clone
impl<T> Clone for SaveBackend<T> {
    fn clone(&self) -> Self {
        SaveBackend {
            filesystem: Arc::clone(&self.filesystem),
            serializer: Arc::clone(&self.serializer),
            options: self.options,
        }
    }
}

impl<T> fmt::Debug for SaveBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveBackend")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// One versioned artifact: identity, path and optional in-memory payload
pub struct SaveFile<T> {
    identity: SaveIdentity,
    path: PathBuf,
    payload: Option<T>,
    backend: SaveBackend<T>,
}

impl<T> SaveFile<T> {
    /// Binds an identity to `{directory}/{encoded file name}`. No I/O.
    pub fn new(identity: SaveIdentity, directory: &Path, backend: SaveBackend<T>) -> Self {
        let path = directory.join(identity.file_name());
        SaveFile {
            identity,
            path,
            payload: None,
            backend,
        }
    }

    /// Binds an identity to a path already found on disk. No I/O.
    ///
    /// The listed name may differ from the re-encoded one (a zero-padded
    /// tick, say), so the path is kept as given.
    pub fn at(identity: SaveIdentity, path: impl Into<PathBuf>, backend: SaveBackend<T>) -> Self {
        SaveFile {
            identity,
            path: path.into(),
            payload: None,
            backend,
        }
    }

    pub fn identity(&self) -> &SaveIdentity {
        &self.identity
    }

    pub fn nickname(&self) -> &str {
        self.identity.nickname()
    }

    pub fn timestamp(&self) -> Tick {
        self.identity.timestamp()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is on disk right now (never cached)
    pub fn exists(&self) -> bool {
        self.backend.filesystem.exists(&self.path)
    }

    /// The payload last saved or loaded through this record
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// Serializes `payload` and writes it to this file's path
    ///
    /// If the path already exists, `resolution` decides: `Fail` returns
    /// [`SaveError::DuplicateFile`], `Overwrite` replaces the file, `Skip`
    /// keeps the existing file and leaves this record's payload unset.
    pub fn save(&mut self, payload: T, resolution: DuplicateFileResolution) -> Result<WriteOutcome> {
        let bytes = self
            .backend
            .serializer
            .encode(&payload, &self.backend.options)
            .map_err(|source| SaveError::Serialization { source })?;

        let outcome = if self.exists() {
            match resolution {
                DuplicateFileResolution::Fail => {
                    return Err(SaveError::DuplicateFile {
                        path: self.path.clone(),
                    });
                }
                DuplicateFileResolution::Skip => {
                    debug!("Save file {} already exists, skipping", self.path.display());
                    self.payload = None;
                    return Ok(WriteOutcome::Skipped);
                }
                DuplicateFileResolution::Overwrite => WriteOutcome::Overwritten,
            }
        } else {
            WriteOutcome::Created
        };

        self.backend
            .filesystem
            .write_all(&self.path, &bytes)
            .map_err(|e| SaveError::io(&self.path, e))?;

        info!("Saved {} ({} bytes)", self.path.display(), bytes.len());
        self.payload = Some(payload);
        Ok(outcome)
    }

    /// Reads and deserializes the file without keeping the payload
    pub fn read(&self) -> Result<T> {
        let bytes = match self.backend.filesystem.read_all(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SaveError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(SaveError::io(&self.path, e)),
        };

        let payload = self
            .backend
            .serializer
            .decode(&bytes, &self.backend.options)
            .map_err(|source| SaveError::Deserialization {
                path: self.path.clone(),
                source,
            })?;

        debug!("Loaded {}", self.path.display());
        Ok(payload)
    }

    /// Reads and deserializes the file, keeping the payload on the record
    pub fn load(&mut self) -> Result<&T> {
        let payload = self.read()?;
        Ok(self.payload.insert(payload))
    }
}

impl<T> fmt::Debug for SaveFile<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveFile")
            .field("identity", &self.identity)
            .field("path", &self.path)
            .field("loaded", &self.payload.is_some())
            .finish()
    }
}
