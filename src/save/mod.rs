//! Versioned save files
//!
//! This module provides a save system with:
//! - Timestamped save files addressed by nickname (`AutoSave_<ticks>.sav.json`)
//! - Bounded backup history per nickname, oldest trimmed first
//! - A re-save throttle against accidental rapid saves
//! - Layered settings with parent fallback
//!
//! # Architecture
//!
//! - `types`: Tick, identity and policy enums
//! - `codec`: identity <-> file name
//! - `serializer` / `filesystem`: collaborator traits and default implementations
//! - `file`: one save file
//! - `folder`: ordered enumeration of a nickname's files
//! - `slot`: save/load/trim for one nickname
//! - `settings`: layered configuration and retention policy
//! - `manager`: save folder location and slot construction
//!
//! # Example Usage
//!
//! ```ignore
//! let manager = SaveManager::<GameState>::with_default_root("Campaign", Arc::new(SaveManagerSettings::new()))?;
//! let mut slot = manager.auto_save_slot()?;
//!
//! let report = slot.save(state, Tick::from_datetime(Utc::now()))?;
//! for warning in &report.trim_warnings {
//!     eprintln!("{warning}");
//! }
//!
//! let state = slot.load_latest_or_else(GameState::default)?;
//! ```

pub mod codec;
pub mod error;
pub mod file;
pub mod filesystem;
pub mod folder;
pub mod manager;
pub mod serializer;
pub mod settings;
pub mod slot;
pub mod types;

// Re-export commonly used types
pub use error::{BoxError, Result, SaveError, TrimWarning};
pub use file::{SaveBackend, SaveFile};
pub use filesystem::{FileSystem, MemoryFileSystem, StdFileSystem};
pub use folder::SaveFolder;
pub use manager::SaveManager;
pub use serializer::{JsonSerializer, PayloadSerializer, SerializerOptions};
pub use settings::{RetentionPolicy, SaveManagerSettings};
pub use slot::{SaveListener, SaveReport, SaveSlot};
pub use types::{DuplicateFileResolution, SaveIdentity, Tick, WriteOutcome};
