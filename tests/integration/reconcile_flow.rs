//! Reconcile flow: full scan, incremental updates, auto versioning

use crate::integration::test_utils::*;
use sordello::config::SordelloConfig;
use sordello::project::ScanMode;
use sordello::store::{FileCategory, ProjectStore};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_first_scan_is_full_and_parses_everything() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Song Project");
    write_set(&root.join("Song.als"), &sample_tracks());
    write_set(&root.join("Backup/Song [2026-01-02 101500].als"), &sample_tracks());

    let harness = Harness::new();
    let report = harness.reconciler().reconcile(&root, false).await.unwrap();

    assert_eq!(report.mode, ScanMode::Full);
    assert_eq!(report.discovered, 2);
    assert_eq!(report.schedule.parsed.len(), 2);
    assert!(report.schedule.failed.is_empty());
    assert!(report.versions_created.is_empty());

    let records = harness.store.fetch_all(&root).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_parsed));
    assert!(records
        .iter()
        .all(|r| r.format_version_tag.as_deref() == Some("11.3.4")));

    let backup = records
        .iter()
        .find(|r| r.category == FileCategory::Backup)
        .unwrap();
    assert_eq!(backup.parent_path.as_deref(), Some(root.join("Song.als").as_path()));

    let tracks = harness.store.fetch_tracks(&root.join("Song.als")).unwrap();
    assert_eq!(tracks.len(), sample_tracks().len());
}

#[tokio::test]
async fn test_second_scan_with_no_changes_parses_nothing() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Quiet");
    write_set(&root.join("Song.als"), &sample_tracks());

    let harness = Harness::new();
    let reconciler = harness.reconciler();
    reconciler.reconcile(&root, false).await.unwrap();
    let report = reconciler.reconcile(&root, false).await.unwrap();

    assert_eq!(report.mode, ScanMode::Incremental);
    assert_eq!(report.new + report.changed + report.deleted + report.retried, 0);
    assert_eq!(report.schedule.total, 0);
    assert!(report.versions_created.is_empty());
}

#[tokio::test]
async fn test_incremental_scan_picks_up_new_changed_and_deleted() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Busy");
    write_set(&root.join("Song.als"), &sample_tracks());
    write_set(&root.join("Sketch.als"), &[audio(1, "Idea", -1)]);

    let harness = Harness::new();
    let reconciler = harness.reconciler();
    reconciler.reconcile(&root, false).await.unwrap();

    write_set(&root.join("Song.als"), &[audio(1, "Only", -1), midi(2, "Keys", -1)]);
    bump_mtime(&root.join("Song.als"), 30);
    write_set(&root.join("Fresh.als"), &[audio(5, "New", -1)]);
    fs::remove_file(root.join("Sketch.als")).unwrap();

    let report = reconciler.reconcile(&root, false).await.unwrap();
    assert_eq!(report.mode, ScanMode::Incremental);
    assert_eq!(report.new, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.deleted, 1);

    assert!(harness.store.fetch_by_path(&root.join("Sketch.als")).unwrap().is_none());
    assert!(harness.store.fetch_by_path(&root.join("Fresh.als")).unwrap().unwrap().is_parsed);

    let tracks = harness.store.fetch_tracks(&root.join("Song.als")).unwrap();
    let names: Vec<_> = tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Only", "Keys"]);
}

#[tokio::test]
async fn test_changed_main_set_gets_a_version() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Versioned");
    let main = root.join("Song.als");
    write_set(&main, &sample_tracks());

    let harness = Harness::new();
    let reconciler = harness.reconciler();
    reconciler.reconcile(&root, false).await.unwrap();

    bump_mtime(&main, 30);
    let report = reconciler.reconcile(&root, false).await.unwrap();
    assert_eq!(report.versions_created.len(), 1);

    let version_path = &report.versions_created[0];
    assert!(version_path.exists());
    assert!(version_path.starts_with(root.join(".sordello/Song/versions")));

    let version = harness.store.fetch_by_path(version_path).unwrap().unwrap();
    assert_eq!(version.category, FileCategory::Version);
    assert_eq!(version.parent_path.as_deref(), Some(main.as_path()));
    assert!(version.is_parsed);
    assert_eq!(
        harness.store.fetch_tracks(version_path).unwrap().len(),
        sample_tracks().len()
    );

    // The version written by the last pass is already recorded
    let next = reconciler.reconcile(&root, false).await.unwrap();
    assert_eq!(next.new, 0);
    assert!(next.versions_created.is_empty());
}

#[tokio::test]
async fn test_auto_versioning_can_be_disabled() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "NoVersions");
    let main = root.join("Song.als");
    write_set(&main, &sample_tracks());

    let mut config = SordelloConfig::default();
    config.reconcile.auto_version_main = false;
    let harness = Harness::with_config(config);
    let reconciler = harness.reconciler();
    reconciler.reconcile(&root, false).await.unwrap();

    bump_mtime(&main, 30);
    let report = reconciler.reconcile(&root, false).await.unwrap();
    assert_eq!(report.changed, 1);
    assert!(report.versions_created.is_empty());
    assert!(!root.join(".sordello/Song/versions").exists());
}

#[tokio::test]
async fn test_unparsable_file_is_retried_until_fixed() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Broken");
    let broken = root.join("Broken.als");
    fs::write(&broken, b"definitely not a live set").unwrap();
    write_set(&root.join("Good.als"), &sample_tracks());

    let harness = Harness::new();
    let reconciler = harness.reconciler();
    let first = reconciler.reconcile(&root, false).await.unwrap();
    assert_eq!(first.schedule.failed.len(), 1);
    assert_eq!(first.schedule.failed[0].0, broken);
    assert_eq!(first.schedule.parsed.len(), 1);

    let record = harness.store.fetch_by_path(&broken).unwrap().unwrap();
    assert!(!record.is_parsed);

    let second = reconciler.reconcile(&root, false).await.unwrap();
    assert_eq!(second.retried, 1);
    assert_eq!(second.schedule.failed.len(), 1);

    write_set(&broken, &[audio(1, "Fixed", -1)]);
    let third = reconciler.reconcile(&root, false).await.unwrap();
    assert!(third.schedule.failed.is_empty());
    assert!(harness.store.fetch_by_path(&broken).unwrap().unwrap().is_parsed);
}

#[tokio::test]
async fn test_forced_full_scan_rebuilds_records() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Forced");
    write_set(&root.join("Song.als"), &sample_tracks());

    let harness = Harness::new();
    let reconciler = harness.reconciler();
    reconciler.reconcile(&root, false).await.unwrap();

    let report = reconciler.reconcile(&root, true).await.unwrap();
    assert_eq!(report.mode, ScanMode::Full);
    assert_eq!(report.schedule.parsed.len(), 1);
    assert_eq!(harness.store.fetch_all(&root).unwrap().len(), 1);
}

#[tokio::test]
async fn test_waves_respect_configured_size() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Many");
    for i in 0..7 {
        write_set(&root.join(format!("Set {}.als", i)), &[audio(i, "T", -1)]);
    }

    let mut config = SordelloConfig::default();
    config.reconcile.wave_size = 3;
    let harness = Harness::with_config(config);
    let report = harness.reconciler().reconcile(&root, false).await.unwrap();

    assert_eq!(report.schedule.total, 7);
    assert_eq!(report.schedule.waves, 3);
    assert_eq!(report.schedule.parsed.len(), 7);
}

#[tokio::test]
async fn test_access_scopes_are_balanced() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Scoped");
    write_set(&root.join("Song.als"), &sample_tracks());

    let harness = Harness::new();
    let reconciler = harness.reconciler();
    reconciler.reconcile(&root, false).await.unwrap();
    reconciler.reconcile(&root, false).await.unwrap();

    assert_eq!(harness.access.open_count(), 0);
    assert_eq!(harness.access.ended_count(), 2);
}

#[tokio::test]
async fn test_missing_root_is_reported() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    let err = harness
        .reconciler()
        .reconcile(&temp.path().join("nowhere"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, sordello::error::ApiError::ProjectNotFound(_)));
    assert_eq!(harness.access.open_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_symlink_does_not_abort_reconcile() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Linked");
    write_set(&root.join("Song.als"), &sample_tracks());
    std::os::unix::fs::symlink(root.join("Missing.als"), root.join("Dead.als")).unwrap();

    let mut config = SordelloConfig::default();
    config.reconcile.follow_symlinks = true;
    let harness = Harness::with_config(config);
    let report = harness.reconciler().reconcile(&root, false).await.unwrap();

    assert_eq!(report.discovered, 1);
    assert_eq!(report.schedule.parsed, vec![root.join("Song.als")]);
    assert_eq!(harness.access.open_count(), 0);
}
