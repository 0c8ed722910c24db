//! Save manager settings with layered defaults
//!
//! Every field of [`SaveManagerSettings`] is an optional override. Reading a
//! field walks the chain: own override, then the parent's value (which may
//! itself come from its parent), then the built-in default. A game can keep
//! one shared baseline and derive per-context settings that change a single
//! option.
//!
//! # Example
//!
//! ```rust
//! use savekeep::SaveManagerSettings;
//! use std::sync::Arc;
//!
//! let base = Arc::new(SaveManagerSettings::new().with_backup_slot_count(5));
//! let quick = SaveManagerSettings::new()
//!     .with_parent(base)
//!     .with_auto_save_nickname("QuickSave");
//!
//! assert_eq!(quick.backup_slot_count(), 5);
//! assert_eq!(quick.auto_save_nickname(), "QuickSave");
//! assert_eq!(quick.file_extension(), ".sav.json");
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::error::{Result, SaveError};
use super::serializer::SerializerOptions;
use super::types::DuplicateFileResolution;

pub const DEFAULT_AUTO_SAVE_NICKNAME: &str = "AutoSave";
pub const DEFAULT_FILE_EXTENSION: &str = ".sav.json";
pub const DEFAULT_BACKUP_SLOT_COUNT: usize = 10;
pub const DEFAULT_RE_SAVE_DELAY: Duration = Duration::from_secs(1);

/// Retention and throttle knobs for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Most files kept per nickname after a save; 0 keeps none
    pub backup_slot_count: usize,
    /// Minimum time between two throttled saves; zero disables the throttle
    pub re_save_delay: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy {
            backup_slot_count: DEFAULT_BACKUP_SLOT_COUNT,
            re_save_delay: DEFAULT_RE_SAVE_DELAY,
        }
    }
}

impl RetentionPolicy {
    /// Number of oldest files to delete when `count` files exist
    pub fn excess(&self, count: usize) -> usize {
        count.saturating_sub(self.backup_slot_count)
    }
}

/// Layered save configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveManagerSettings {
    #[serde(skip)]
    parent: Option<Arc<SaveManagerSettings>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    serializer_options: Option<SerializerOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_save_nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_slot_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicate_file_resolution: Option<DuplicateFileResolution>,
    #[serde(
        rename = "re_save_delay_ms",
        with = "duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    re_save_delay: Option<Duration>,
}

impl SaveManagerSettings {
    /// Settings with no overrides and no parent (pure built-in defaults)
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the overrides from a JSON settings document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON settings document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SaveError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// The overrides as JSON (the parent link is not included)
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_parent(mut self, parent: Arc<SaveManagerSettings>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_serializer_options(mut self, options: SerializerOptions) -> Self {
        self.serializer_options = Some(options);
        self
    }

    pub fn with_auto_save_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.auto_save_nickname = Some(nickname.into());
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = Some(extension.into());
        self
    }

    pub fn with_backup_slot_count(mut self, count: usize) -> Self {
        self.backup_slot_count = Some(count);
        self
    }

    pub fn with_duplicate_file_resolution(mut self, resolution: DuplicateFileResolution) -> Self {
        self.duplicate_file_resolution = Some(resolution);
        self
    }

    pub fn with_re_save_delay(mut self, delay: Duration) -> Self {
        self.re_save_delay = Some(delay);
        self
    }

    pub fn parent(&self) -> Option<&Arc<SaveManagerSettings>> {
        self.parent.as_ref()
    }

    /// First override of a field found walking up the parent chain
    fn resolve<V: Clone>(&self, field: impl Fn(&SaveManagerSettings) -> Option<&V>) -> Option<V> {
        let mut current = Some(self);
        while let Some(settings) = current {
            if let Some(value) = field(settings) {
                return Some(value.clone());
            }
            current = settings.parent.as_deref();
        }
        None
    }

    pub fn serializer_options(&self) -> SerializerOptions {
        self.resolve(|s| s.serializer_options.as_ref())
            .unwrap_or_default()
    }

    pub fn auto_save_nickname(&self) -> String {
        self.resolve(|s| s.auto_save_nickname.as_ref())
            .unwrap_or_else(|| DEFAULT_AUTO_SAVE_NICKNAME.to_string())
    }

    pub fn file_extension(&self) -> String {
        self.resolve(|s| s.file_extension.as_ref())
            .unwrap_or_else(|| DEFAULT_FILE_EXTENSION.to_string())
    }

    pub fn backup_slot_count(&self) -> usize {
        self.resolve(|s| s.backup_slot_count.as_ref())
            .unwrap_or(DEFAULT_BACKUP_SLOT_COUNT)
    }

    pub fn duplicate_file_resolution(&self) -> DuplicateFileResolution {
        self.resolve(|s| s.duplicate_file_resolution.as_ref())
            .unwrap_or_default()
    }

    pub fn re_save_delay(&self) -> Duration {
        self.resolve(|s| s.re_save_delay.as_ref())
            .unwrap_or(DEFAULT_RE_SAVE_DELAY)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            backup_slot_count: self.backup_slot_count(),
            re_save_delay: self.re_save_delay(),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(delay) => {
                let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                serializer.serialize_u64(millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
