use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use savekeep::{
    SaveBackend, SaveError, SaveManager, SaveManagerSettings, StdFileSystem, Tick, WriteOutcome,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Progress {
    chapter: u32,
    notes: Vec<String>,
}

fn progress(chapter: u32) -> Progress {
    Progress {
        chapter,
        notes: vec![format!("chapter {chapter}")],
    }
}

fn manager(root: &Path, settings: SaveManagerSettings) -> SaveManager<Progress> {
    SaveManager::new(
        root,
        "Campaign",
        SaveBackend::json_on(Arc::new(StdFileSystem)),
        Arc::new(settings),
    )
    .unwrap()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_missing_folder_means_empty_slot() {
    let root = tempfile::tempdir().unwrap();
    let manager = manager(root.path(), SaveManagerSettings::new());
    let slot = manager.auto_save_slot().unwrap();

    assert_eq!(slot.save_file_count().unwrap(), 0);
    assert!(matches!(slot.latest_file(), Err(SaveError::NoSaveFile { .. })));
    assert!(!manager.save_directory().exists());
}

#[test]
fn test_retention_keeps_most_recent_on_disk() {
    let root = tempfile::tempdir().unwrap();
    let settings = SaveManagerSettings::new()
        .with_backup_slot_count(3)
        .with_re_save_delay(Duration::from_secs(60));
    let manager = manager(root.path(), settings);
    let mut slot = manager.auto_save_slot().unwrap();

    let start = Utc.with_ymd_and_hms(2021, 9, 14, 0, 0, 0).unwrap();
    for minute in 0..6u32 {
        let now = Tick::from_datetime(start + chrono::Duration::minutes(minute as i64));
        let report = slot.save(progress(minute), now).unwrap();
        assert_eq!(report.outcome, WriteOutcome::Created);
        assert!(report.trim_warnings.is_empty());
    }

    assert_eq!(
        file_names(manager.save_directory()),
        vec![
            "AutoSave_637671745800000000.sav.json".to_string(),
            "AutoSave_637671746400000000.sav.json".to_string(),
            "AutoSave_637671747000000000.sav.json".to_string(),
        ]
    );
    assert_eq!(slot.load_latest().unwrap(), progress(5));
}

#[test]
fn test_files_written_out_of_order_still_pick_max_tick() {
    let root = tempfile::tempdir().unwrap();
    let settings = SaveManagerSettings::new().with_backup_slot_count(4);
    let manager = manager(root.path(), settings);
    let mut slot = manager.slot("Manual").unwrap();

    for chapter in [4u32, 9, 2, 7] {
        slot.save_unthrottled(progress(chapter), Tick::new(chapter as u64 * 1_000))
            .unwrap();
    }

    let latest = slot.latest_file().unwrap();
    assert_eq!(latest.timestamp(), Tick::new(9_000));
    assert_eq!(latest.read().unwrap(), progress(9));

    // A fresh slot over the same folder sees the same history
    let reopened = manager.slot("Manual").unwrap();
    let ticks: Vec<u64> = reopened
        .history()
        .unwrap()
        .iter()
        .map(|file| file.timestamp().as_u64())
        .collect();
    assert_eq!(ticks, vec![2_000, 4_000, 7_000, 9_000]);
}

#[test]
fn test_foreign_files_are_ignored() {
    let root = tempfile::tempdir().unwrap();
    let manager = manager(root.path(), SaveManagerSettings::new());
    let dir = manager.save_directory().to_path_buf();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("AutoSave_backup.sav.json"), b"{}").unwrap();
    std::fs::write(dir.join("readme.txt"), b"hi").unwrap();

    let mut slot = manager.auto_save_slot().unwrap();
    slot.save(progress(1), Tick::new(10)).unwrap();

    assert_eq!(slot.save_file_count().unwrap(), 1);
    assert_eq!(file_names(&dir).len(), 3);
}

#[test]
fn test_settings_file_drives_slot() {
    let root = tempfile::tempdir().unwrap();
    let config = root.path().join("saves.json");
    std::fs::write(
        &config,
        r#"{ "auto_save_nickname": "Quick", "file_extension": ".save", "backup_slot_count": 1, "re_save_delay_ms": 0 }"#,
    )
    .unwrap();

    let settings = SaveManagerSettings::load(&config).unwrap();
    let manager = manager(root.path(), settings);
    let mut slot = manager.auto_save_slot().unwrap();

    slot.save(progress(1), Tick::new(1)).unwrap();
    let report = slot.save(progress(2), Tick::new(2)).unwrap();

    assert_eq!(report.trimmed.len(), 1);
    assert_eq!(file_names(manager.save_directory()), vec!["Quick_2.save".to_string()]);
}
