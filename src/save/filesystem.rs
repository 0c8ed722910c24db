//! Filesystem collaborator
//!
//! Save files are read, written, deleted and listed through the
//! [`FileSystem`] trait. [`StdFileSystem`] talks to the real disk;
//! [`MemoryFileSystem`] keeps everything in a map, which makes throttle and
//! retention behaviour observable without touching the disk.
//!
//! No implementation holds a file handle beyond the call that opened it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use wildmatch::WildMatch;

/// Narrow filesystem interface consumed by the save engine
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file; `io::ErrorKind::NotFound` if it is missing
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replaces the file contents, creating parent directories as needed
    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Deletes a file. `Ok(false)` if there was nothing to delete.
    fn delete(&self, path: &Path) -> io::Result<bool>;

    /// Files directly inside `dir` whose name matches a `*`/`?` pattern
    ///
    /// A missing directory yields an empty list.
    fn list_files(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem, via `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write next to the target first so a crash never leaves a
        // half-written save under the real name
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        if let Err(e) = fs::write(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> io::Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_files(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let matcher = WildMatch::new(pattern);
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if matcher.matches(name) {
                    files.push(entry.path());
                }
            }
        }
        Ok(files)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, Vec<u8>>,
    failing_deletes: BTreeSet<PathBuf>,
    writes: usize,
    deletes: usize,
}

/// In-memory filesystem
///
/// Counts writes and deletes, and can be told to refuse deleting specific
/// paths, which is how partial retention failures are exercised.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means another test thread panicked mid-call;
        // the map itself is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of successful `write_all` calls so far
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    /// Number of files actually removed by `delete` so far
    pub fn delete_count(&self) -> usize {
        self.state().deletes
    }

    /// Makes every future `delete` of `path` fail with `PermissionDenied`
    pub fn fail_deletes_for(&self, path: impl Into<PathBuf>) {
        self.state().failing_deletes.insert(path.into());
    }

    /// Stores a file directly, bypassing the write counter
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.state().files.insert(path.into(), bytes.into());
    }

    /// Every stored path, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state().files.keys().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.state().files.contains_key(path)
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.state().files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    fn write_all(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        state.files.insert(path.to_path_buf(), bytes.to_vec());
        state.writes += 1;
        Ok(())
    }

    fn delete(&self, path: &Path) -> io::Result<bool> {
        let mut state = self.state();
        if state.failing_deletes.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is locked", path.display()),
            ));
        }
        let removed = state.files.remove(path).is_some();
        if removed {
            state.deletes += 1;
        }
        Ok(removed)
    }

    fn list_files(&self, dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let matcher = WildMatch::new(pattern);
        let files = self
            .state()
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| matcher.matches(name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        Ok(files)
    }
}
