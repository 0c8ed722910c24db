//! Save slots: one nickname's ongoing history
//!
//! A [`SaveSlot`] is what callers save to and load from. It holds no file
//! state of its own; every query lists the save folder again, so the disk is
//! always the source of truth.
//!
//! Saving a slot does three things in order:
//! - Throttle check against the last known save (no write on rejection)
//! - Write `{nickname}_{now}{extension}` with the configured duplicate policy
//! - Trim the oldest files beyond the backup cap (best effort)
//!
//! # Rust Learning Notes
//!
//! - **Side-channel warnings**: trim failures come back inside
//!   [`SaveReport`] instead of as an `Err`, because the save already
//!   happened and must not be reported as failed.
//! - **Caller-supplied clock**: `now` is always a parameter, which keeps
//!   throttling and ordering deterministic in tests.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::codec;
use super::error::{Result, SaveError, TrimWarning};
use super::file::SaveFile;
use super::folder::SaveFolder;
use super::settings::{RetentionPolicy, SaveManagerSettings};
use super::types::{SaveIdentity, Tick, WriteOutcome, duration_to_ticks};

/// Callbacks invoked after a slot finishes a save or load
///
/// Both methods default to doing nothing, so listeners only implement what
/// they care about.
pub trait SaveListener<T>: Send + Sync {
    fn on_saved(&self, _file: &SaveFile<T>, _outcome: WriteOutcome) {}

    fn on_loaded(&self, _file: &SaveFile<T>, _payload: &T) {}
}

/// Result of a successful slot save
#[derive(Debug)]
pub struct SaveReport<T> {
    /// The file just saved (payload attached unless the save was skipped)
    pub file: SaveFile<T>,
    pub outcome: WriteOutcome,
    /// Backups deleted by retention trimming
    pub trimmed: Vec<PathBuf>,
    /// Backups that should have been deleted but could not be
    pub trim_warnings: Vec<TrimWarning>,
}

/// The named history of saves for one nickname
pub struct SaveSlot<T> {
    nickname: String,
    extension: String,
    folder: SaveFolder<T>,
    settings: Arc<SaveManagerSettings>,
    last_saved: Option<Tick>,
    listeners: Vec<Arc<dyn SaveListener<T>>>,
}

impl<T> SaveSlot<T> {
    /// Creates a slot; validates the nickname and extension, no I/O
    ///
    /// The folder's serializer options are replaced by the ones the
    /// settings resolve to.
    pub fn new(
        nickname: impl Into<String>,
        folder: SaveFolder<T>,
        settings: Arc<SaveManagerSettings>,
    ) -> Result<Self> {
        let nickname = nickname.into();
        codec::validate_nickname(&nickname)?;
        let extension = settings.file_extension();
        codec::validate_extension(&extension)?;

        let backend = folder.backend().with_options(settings.serializer_options());
        let folder = SaveFolder::new(folder.directory(), backend);

        Ok(SaveSlot {
            nickname,
            extension,
            folder,
            settings,
            last_saved: None,
            listeners: Vec::new(),
        })
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn folder(&self) -> &SaveFolder<T> {
        &self.folder
    }

    pub fn settings(&self) -> &Arc<SaveManagerSettings> {
        &self.settings
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        self.settings.retention_policy()
    }

    /// Registers a listener called after every save and load of this slot
    pub fn add_listener(&mut self, listener: Arc<dyn SaveListener<T>>) {
        self.listeners.push(listener);
    }

    /// Every save of this nickname on disk, oldest first
    pub fn history(&self) -> Result<Vec<SaveFile<T>>> {
        self.folder
            .enumerate_save_files(&self.nickname, &self.extension)
    }

    /// Number of saves on disk (fresh listing every call)
    pub fn save_file_count(&self) -> Result<usize> {
        Ok(self.history()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.save_file_count()? == 0)
    }

    /// The save with the highest encoded tick
    ///
    /// Fails with [`SaveError::NoSaveFile`] when the slot is empty.
    pub fn latest_file(&self) -> Result<SaveFile<T>> {
        self.history()?
            .pop()
            .ok_or_else(|| SaveError::NoSaveFile {
                nickname: self.nickname.clone(),
            })
    }

    /// Loads the payload of the latest save
    pub fn load_latest(&self) -> Result<T> {
        let file = self.latest_file()?;
        let payload = file.read()?;
        info!("Loaded save {} for {:?}", file.path().display(), self.nickname);

        for listener in &self.listeners {
            listener.on_loaded(&file, &payload);
        }
        Ok(payload)
    }

    /// Loads the latest payload, or builds a fresh one when the slot is empty
    pub fn load_latest_or_else(&self, factory: impl FnOnce() -> T) -> Result<T> {
        match self.load_latest() {
            Err(SaveError::NoSaveFile { .. }) => {
                debug!("No save for {:?}, starting from a fresh value", self.nickname);
                Ok(factory())
            }
            other => other,
        }
    }

    /// Saves `payload` at tick `now`, subject to the re-save throttle
    pub fn save(&mut self, payload: T, now: Tick) -> Result<SaveReport<T>> {
        self.save_inner(payload, now, true)
    }

    /// Saves `payload` at tick `now` without the re-save throttle
    pub fn save_unthrottled(&mut self, payload: T, now: Tick) -> Result<SaveReport<T>> {
        self.save_inner(payload, now, false)
    }

    /// Timestamp of the newest save this slot knows about, on disk or in memory
    fn last_known_save(&self) -> Result<Option<Tick>> {
        let on_disk = self.history()?.last().map(SaveFile::timestamp);
        Ok(on_disk.max(self.last_saved))
    }

    fn check_throttle(&self, policy: &RetentionPolicy, now: Tick) -> Result<()> {
        if policy.re_save_delay.is_zero() {
            return Ok(());
        }
        let Some(last) = self.last_known_save()? else {
            return Ok(());
        };

        // Negative when `now` is older than the last save, which also counts as too soon
        let elapsed = now.ticks_since(last);
        if elapsed < duration_to_ticks(policy.re_save_delay) as i128 {
            debug!(
                "Refusing save of {:?} at {}: last save at {}, delay {:?}",
                self.nickname, now, last, policy.re_save_delay
            );
            return Err(SaveError::ReSaveTooSoon {
                nickname: self.nickname.clone(),
                last,
                now,
                delay: policy.re_save_delay,
            });
        }
        Ok(())
    }

    fn save_inner(&mut self, payload: T, now: Tick, use_throttle: bool) -> Result<SaveReport<T>> {
        let policy = self.settings.retention_policy();
        if use_throttle {
            self.check_throttle(&policy, now)?;
        }

        let identity = SaveIdentity::new(self.nickname.clone(), now, self.extension.clone())?;
        let mut file = self.folder.file_for(identity);
        let outcome = file.save(payload, self.settings.duplicate_file_resolution())?;
        self.last_saved = Some(now);

        let (trimmed, trim_warnings) = self.trim(&policy, file.path());

        for listener in &self.listeners {
            listener.on_saved(&file, outcome);
        }

        Ok(SaveReport {
            file,
            outcome,
            trimmed,
            trim_warnings,
        })
    }

    /// Deletes the oldest saves beyond the backup cap
    ///
    /// Only the oldest `count - cap` files are candidates; a failed delete is
    /// reported and not made up for by deleting a newer file.
    fn trim(&self, policy: &RetentionPolicy, just_saved: &Path) -> (Vec<PathBuf>, Vec<TrimWarning>) {
        let mut trimmed = Vec::new();
        let mut warnings = Vec::new();

        let history = match self.history() {
            Ok(history) => history,
            Err(e) => {
                warn!("Could not list {:?} saves for trimming: {}", self.nickname, e);
                let source = match e {
                    SaveError::Io { source, .. } => source,
                    other => io::Error::other(other),
                };
                warnings.push(TrimWarning {
                    path: self.folder.directory().to_path_buf(),
                    source,
                });
                return (trimmed, warnings);
            }
        };

        let excess = policy.excess(history.len());
        let filesystem = &self.folder.backend().filesystem;
        for file in history.iter().take(excess) {
            match filesystem.delete(file.path()) {
                Ok(true) => {
                    debug!("Trimmed backup {}", file.path().display());
                    if file.path() == just_saved {
                        warn!(
                            "Save {} was trimmed right after being written",
                            file.path().display()
                        );
                    }
                    trimmed.push(file.path().to_path_buf());
                }
                Ok(false) => debug!("Backup {} already gone", file.path().display()),
                Err(source) => {
                    warn!("Failed to trim backup {}: {}", file.path().display(), source);
                    warnings.push(TrimWarning {
                        path: file.path().to_path_buf(),
                        source,
                    });
                }
            }
        }

        (trimmed, warnings)
    }
}

impl<T> fmt::Debug for SaveSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveSlot")
            .field("nickname", &self.nickname)
            .field("extension", &self.extension)
            .field("folder", &self.folder)
            .field("last_saved", &self.last_saved)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::file::SaveBackend;
    use crate::save::filesystem::MemoryFileSystem;
    use crate::save::types::DuplicateFileResolution;
    use serde::{Deserialize, Serialize};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct GameState {
        level: u32,
    }

    fn secs(s: f64) -> Tick {
        Tick::from_duration(Duration::from_secs_f64(s))
    }

    fn slot_with(
        fs: &Arc<MemoryFileSystem>,
        settings: SaveManagerSettings,
    ) -> SaveSlot<GameState> {
        let folder = SaveFolder::new("/data/SaveData/Main", SaveBackend::json_on(fs.clone()));
        SaveSlot::new("AutoSave", folder, Arc::new(settings)).unwrap()
    }

    fn scenario_settings() -> SaveManagerSettings {
        SaveManagerSettings::new()
            .with_backup_slot_count(2)
            .with_re_save_delay(Duration::from_secs(1))
    }

    fn timestamps(slot: &SaveSlot<GameState>) -> Vec<Tick> {
        slot.history()
            .unwrap()
            .iter()
            .map(SaveFile::timestamp)
            .collect()
    }

    #[test]
    fn test_new_slot_performs_no_io() {
        let fs = Arc::new(MemoryFileSystem::new());
        let slot = slot_with(&fs, scenario_settings());
        assert_eq!(fs.write_count(), 0);
        assert!(slot.is_empty().unwrap());
    }

    #[test]
    fn test_new_slot_rejects_bad_nickname() {
        let fs = Arc::new(MemoryFileSystem::new());
        let folder = SaveFolder::<GameState>::new("/saves", SaveBackend::json_on(fs));
        let result = SaveSlot::new("bad|name", folder, Arc::new(SaveManagerSettings::new()));
        assert!(matches!(result, Err(SaveError::InvalidNickname { .. })));
    }

    #[test]
    fn test_new_slot_rejects_bad_extension() {
        let fs = Arc::new(MemoryFileSystem::new());
        let folder = SaveFolder::<GameState>::new("/saves", SaveBackend::json_on(fs));
        let settings = SaveManagerSettings::new().with_file_extension("sav");
        let result = SaveSlot::new("AutoSave", folder, Arc::new(settings));
        assert!(matches!(result, Err(SaveError::InvalidExtension { .. })));
    }

    #[test]
    fn test_latest_file_on_empty_slot() {
        let fs = Arc::new(MemoryFileSystem::new());
        let slot = slot_with(&fs, scenario_settings());
        let err = slot.latest_file().unwrap_err();
        assert!(matches!(err, SaveError::NoSaveFile { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_scenario_retention_and_throttle() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());
        let data = GameState { level: 1 };

        let report = slot.save(data.clone(), secs(0.0)).unwrap();
        assert_eq!(
            report.file.path(),
            Path::new("/data/SaveData/Main/AutoSave_0.sav.json")
        );
        assert_eq!(slot.save_file_count().unwrap(), 1);

        slot.save(data.clone(), secs(2.0)).unwrap();
        assert_eq!(slot.save_file_count().unwrap(), 2);

        let report = slot.save(data.clone(), secs(4.0)).unwrap();
        assert_eq!(
            report.trimmed,
            vec![PathBuf::from("/data/SaveData/Main/AutoSave_0.sav.json")]
        );
        assert!(report.trim_warnings.is_empty());
        assert_eq!(slot.save_file_count().unwrap(), 2);
        assert_eq!(slot.latest_file().unwrap().timestamp(), secs(4.0));

        let writes_before = fs.write_count();
        let err = slot.save(data.clone(), secs(4.2)).unwrap_err();
        assert!(matches!(err, SaveError::ReSaveTooSoon { .. }));
        assert_eq!(fs.write_count(), writes_before);
        assert_eq!(timestamps(&slot), vec![secs(2.0), secs(4.0)]);
    }

    #[test]
    fn test_unthrottled_save_bypasses_delay() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());

        slot.save(GameState { level: 1 }, secs(1.0)).unwrap();
        slot.save_unthrottled(GameState { level: 2 }, secs(1.5)).unwrap();

        assert_eq!(slot.load_latest().unwrap(), GameState { level: 2 });
    }

    #[test]
    fn test_earlier_timestamp_is_throttled() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());

        slot.save(GameState { level: 1 }, secs(10.0)).unwrap();
        let err = slot.save(GameState { level: 2 }, secs(3.0)).unwrap_err();
        assert!(matches!(err, SaveError::ReSaveTooSoon { .. }));
    }

    #[test]
    fn test_zero_delay_disables_throttle() {
        let fs = Arc::new(MemoryFileSystem::new());
        let settings = SaveManagerSettings::new().with_re_save_delay(Duration::ZERO);
        let mut slot = slot_with(&fs, settings);

        for t in [5u64, 1, 9, 3] {
            slot.save(GameState { level: t as u32 }, Tick::new(t)).unwrap();
        }

        assert_eq!(slot.save_file_count().unwrap(), 4);
        assert_eq!(slot.latest_file().unwrap().timestamp(), Tick::new(9));
        assert_eq!(slot.load_latest().unwrap(), GameState { level: 9 });
    }

    #[test]
    fn test_zero_backups_keeps_nothing() {
        let fs = Arc::new(MemoryFileSystem::new());
        let settings = SaveManagerSettings::new()
            .with_backup_slot_count(0)
            .with_re_save_delay(Duration::ZERO);
        let mut slot = slot_with(&fs, settings);

        for t in [1u64, 2, 3] {
            let report = slot.save(GameState { level: t as u32 }, Tick::new(t)).unwrap();
            assert_eq!(report.outcome, WriteOutcome::Created);
            assert_eq!(report.trimmed, vec![report.file.path().to_path_buf()]);
            assert!(report.trim_warnings.is_empty());
            assert_eq!(slot.save_file_count().unwrap(), 0);
        }
        assert!(fs.paths().is_empty());
    }

    #[test]
    fn test_padded_tick_files_load_and_trim() {
        let fs = Arc::new(MemoryFileSystem::new());
        let padded = "/data/SaveData/Main/AutoSave_0000000000000000005.sav.json";
        fs.insert(padded, b"{\"level\":5}".to_vec());
        let settings = SaveManagerSettings::new()
            .with_backup_slot_count(1)
            .with_re_save_delay(Duration::ZERO);
        let mut slot = slot_with(&fs, settings);

        let latest = slot.latest_file().unwrap();
        assert_eq!(latest.path(), Path::new(padded));
        assert!(latest.exists());
        assert_eq!(slot.load_latest().unwrap(), GameState { level: 5 });

        let report = slot.save(GameState { level: 10 }, Tick::new(10)).unwrap();
        assert_eq!(report.trimmed, vec![PathBuf::from(padded)]);
        assert!(report.trim_warnings.is_empty());
        assert_eq!(slot.save_file_count().unwrap(), 1);
        assert_eq!(slot.load_latest().unwrap(), GameState { level: 10 });
    }

    #[test]
    fn test_same_tick_is_duplicate_by_default() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());

        slot.save(GameState { level: 1 }, secs(1.0)).unwrap();
        let err = slot.save_unthrottled(GameState { level: 2 }, secs(1.0)).unwrap_err();
        assert!(matches!(err, SaveError::DuplicateFile { .. }));
        assert_eq!(slot.load_latest().unwrap(), GameState { level: 1 });
    }

    #[test]
    fn test_same_tick_overwrite_when_configured() {
        let fs = Arc::new(MemoryFileSystem::new());
        let settings = scenario_settings().with_duplicate_file_resolution(DuplicateFileResolution::Overwrite);
        let mut slot = slot_with(&fs, settings);

        slot.save(GameState { level: 1 }, secs(1.0)).unwrap();
        let report = slot.save_unthrottled(GameState { level: 2 }, secs(1.0)).unwrap();
        assert_eq!(report.outcome, WriteOutcome::Overwritten);
        assert_eq!(slot.save_file_count().unwrap(), 1);
        assert_eq!(slot.load_latest().unwrap(), GameState { level: 2 });
    }

    #[test]
    fn test_failed_trim_is_a_warning() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());

        slot.save(GameState { level: 1 }, secs(0.0)).unwrap();
        slot.save(GameState { level: 2 }, secs(2.0)).unwrap();
        fs.fail_deletes_for("/data/SaveData/Main/AutoSave_0.sav.json");

        let report = slot.save(GameState { level: 3 }, secs(4.0)).unwrap();
        assert_eq!(report.outcome, WriteOutcome::Created);
        assert!(report.trimmed.is_empty());
        assert_eq!(report.trim_warnings.len(), 1);
        assert_eq!(
            report.trim_warnings[0].path,
            PathBuf::from("/data/SaveData/Main/AutoSave_0.sav.json")
        );

        // The newer backup is not sacrificed to make up for the failure
        assert_eq!(slot.save_file_count().unwrap(), 3);
        assert_eq!(slot.load_latest().unwrap(), GameState { level: 3 });
    }

    #[test]
    fn test_other_nicknames_are_untouched_by_trim() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/data/SaveData/Main/AutoSave_7_1.sav.json", b"{\"level\":0}".to_vec());
        fs.insert("/data/SaveData/Main/Manual_1.sav.json", b"{\"level\":0}".to_vec());
        let mut slot = slot_with(&fs, scenario_settings());

        for (i, t) in [0.0, 2.0, 4.0, 6.0].into_iter().enumerate() {
            slot.save(GameState { level: i as u32 }, secs(t)).unwrap();
        }

        assert_eq!(slot.save_file_count().unwrap(), 2);
        assert_eq!(fs.paths().len(), 4);
    }

    #[test]
    fn test_load_latest_or_else_uses_factory_when_empty() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());

        let fresh = slot.load_latest_or_else(|| GameState { level: 99 }).unwrap();
        assert_eq!(fresh, GameState { level: 99 });

        slot.save(GameState { level: 4 }, secs(1.0)).unwrap();
        let loaded = slot.load_latest_or_else(|| GameState { level: 99 }).unwrap();
        assert_eq!(loaded, GameState { level: 4 });
    }

    #[test]
    fn test_load_latest_or_else_keeps_real_errors() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("/data/SaveData/Main/AutoSave_5.sav.json", b"garbage".to_vec());
        let slot = slot_with(&fs, scenario_settings());

        let result = slot.load_latest_or_else(|| GameState { level: 0 });
        assert!(matches!(result, Err(SaveError::Deserialization { .. })));
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SaveListener<GameState> for Recorder {
        fn on_saved(&self, file: &SaveFile<GameState>, outcome: WriteOutcome) {
            self.events
                .lock()
                .unwrap()
                .push(format!("saved {} {:?}", file.timestamp(), outcome));
        }

        fn on_loaded(&self, file: &SaveFile<GameState>, payload: &GameState) {
            self.events
                .lock()
                .unwrap()
                .push(format!("loaded {} level {}", file.timestamp(), payload.level));
        }
    }

    #[test]
    fn test_listeners_run_after_save_and_load() {
        let fs = Arc::new(MemoryFileSystem::new());
        let mut slot = slot_with(&fs, scenario_settings());
        let recorder = Arc::new(Recorder::default());
        slot.add_listener(recorder.clone());

        slot.save(GameState { level: 2 }, Tick::new(50)).unwrap();
        let _ = slot.save(GameState { level: 3 }, Tick::new(51));
        slot.load_latest().unwrap();

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec!["saved 50 Created", "loaded 50 level 2"]);
    }

    #[test]
    fn test_serializer_options_follow_settings() {
        let fs = Arc::new(MemoryFileSystem::new());
        let settings = scenario_settings()
            .with_serializer_options(crate::save::serializer::SerializerOptions { pretty: false });
        let mut slot = slot_with(&fs, settings);

        let report = slot.save(GameState { level: 1 }, Tick::new(1)).unwrap();
        let bytes = crate::save::filesystem::FileSystem::read_all(fs.as_ref(), report.file.path()).unwrap();
        assert_eq!(bytes, br#"{"level":1}"#.to_vec());
    }
}
