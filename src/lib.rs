//! Versioned save-file persistence
//!
//! Turns an in-memory payload into a durable, timestamped file addressed by
//! nickname, keeps a bounded history of backups per nickname, and throttles
//! rapid re-saves. See [`save`] for the architecture.
//!
//! All operations are synchronous and hold no file handles between calls.
//! Throttling is per [`SaveSlot`] instance only; callers must serialize
//! access to a save folder themselves.

pub mod save;

pub use save::{
    DuplicateFileResolution, FileSystem, JsonSerializer, MemoryFileSystem, PayloadSerializer,
    RetentionPolicy, SaveBackend, SaveError, SaveFile, SaveFolder, SaveIdentity, SaveListener,
    SaveManager, SaveManagerSettings, SaveReport, SaveSlot, SerializerOptions, StdFileSystem, Tick,
    TrimWarning, WriteOutcome,
};
