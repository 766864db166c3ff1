//! Service flow: track versions, subproject links, listings

use crate::integration::test_utils::*;
use sordello::error::{ApiError, ParseError};
use sordello::store::{FileCategory, ProjectStore};
use std::path::Path;
use tempfile::TempDir;

fn scanned_project(name: &str) -> (TempDir, std::path::PathBuf, Harness) {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, name);
    write_set(&root.join("Song.als"), &sample_tracks());
    (temp, root, Harness::new())
}

#[tokio::test]
async fn test_track_version_of_group_links_subproject() {
    let (_temp, root, harness) = scanned_project("Linked");
    let service = harness.service();
    service.reconcile(&root, false).await.unwrap();

    let main = root.join("Song.als");
    let record = service.extract_track_version(&main, 10).unwrap();

    assert_eq!(record.category, FileCategory::TrackVersion);
    assert_eq!(record.parent_path.as_deref(), Some(main.as_path()));
    assert_eq!(record.source_track_id, Some(10));
    assert_eq!(record.source_track_name.as_deref(), Some("Drums"));
    assert!(record.is_parsed);
    assert!(record.path.starts_with(root.join(".sordello/Song/liveSetTracks/10")));
    assert!(record.path.exists());

    let stored = harness.store.fetch_by_path(&record.path).unwrap().unwrap();
    assert_eq!(stored, record);
    assert_eq!(harness.store.fetch_tracks(&record.path).unwrap().len(), 6);

    let main_tracks = harness.store.fetch_tracks(&main).unwrap();
    let drums = main_tracks.iter().find(|t| t.id == 10).unwrap();
    assert_eq!(drums.subproject_link.as_deref(), Some(record.path.as_path()));
    assert_eq!(harness.access.open_count(), 0);
}

#[tokio::test]
async fn test_track_version_of_plain_track_has_no_link() {
    let (_temp, root, harness) = scanned_project("Plain");
    let service = harness.service();
    service.reconcile(&root, false).await.unwrap();

    let main = root.join("Song.als");
    service.extract_track_version(&main, 20).unwrap();

    let main_tracks = harness.store.fetch_tracks(&main).unwrap();
    assert!(main_tracks.iter().all(|t| t.subproject_link.is_none()));
}

#[tokio::test]
async fn test_track_versions_are_seen_by_next_scan() {
    let (_temp, root, harness) = scanned_project("History");
    let service = harness.service();
    service.reconcile(&root, false).await.unwrap();

    let main = root.join("Song.als");
    let first = service.extract_track_version(&main, 11).unwrap();
    let second = service.extract_track_version(&main, 11).unwrap();
    assert_ne!(first.path, second.path);

    let report = service.reconcile(&root, false).await.unwrap();
    assert_eq!(report.new, 0);
    assert_eq!(report.schedule.total, 0);

    let files = service.files(&root).unwrap();
    let track_versions: Vec<_> = files
        .iter()
        .filter(|r| r.category == FileCategory::TrackVersion)
        .collect();
    assert_eq!(track_versions.len(), 2);
    assert!(track_versions.iter().all(|r| r.source_track_id == Some(11)));
}

#[tokio::test]
async fn test_files_are_sorted_by_path() {
    let temp = TempDir::new().unwrap();
    let root = project_root(&temp, "Listing");
    write_set(&root.join("b.als"), &sample_tracks());
    write_set(&root.join("a.als"), &sample_tracks());
    let harness = Harness::new();
    let service = harness.service();
    service.reconcile(&root, false).await.unwrap();

    let files = service.files(&root).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.als", "b.als"]);
}

#[test]
fn test_tracks_parses_unrecorded_file_from_disk() {
    let (_temp, root, harness) = scanned_project("Unscanned");
    let tracks = harness.service().tracks(&root.join("Song.als")).unwrap();
    assert_eq!(tracks.len(), sample_tracks().len());
    assert_eq!(tracks[0].name, "Drums");
    assert_eq!(harness.access.open_count(), 0);
}

#[tokio::test]
async fn test_tracks_prefers_stored_records() {
    let (_temp, root, harness) = scanned_project("Stored");
    let service = harness.service();
    service.reconcile(&root, false).await.unwrap();

    let main = root.join("Song.als");
    let mut drums = harness
        .store
        .fetch_tracks(&main)
        .unwrap()
        .into_iter()
        .find(|t| t.id == 10)
        .unwrap();
    drums.subproject_link = Some(Path::new("/elsewhere/Drums.als").to_path_buf());
    harness.store.update_track(&main, &drums).unwrap();

    let tracks = service.tracks(&main).unwrap();
    let drums = tracks.iter().find(|t| t.id == 10).unwrap();
    assert!(drums.subproject_link.is_some());
}

#[test]
fn test_missing_files_surface_not_found() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::new();
    let service = harness.service();

    let err = service.tracks(&temp.path().join("Ghost.als")).unwrap_err();
    assert!(matches!(err, ApiError::Parse(ParseError::NotFound(_))));

    let err = service
        .extract_track_version(&temp.path().join("Ghost.als"), 1)
        .unwrap_err();
    assert!(matches!(err, ApiError::Parse(ParseError::NotFound(_))));

    let err = service.files(&temp.path().join("none")).unwrap_err();
    assert!(matches!(err, ApiError::ProjectNotFound(_)));
}

#[test]
fn test_extract_to_explicit_output() {
    let (temp, root, harness) = scanned_project("Explicit");
    let output = temp.path().join("Bass.als");
    let result = harness
        .service()
        .extract(&root.join("Song.als"), 20, &output)
        .unwrap();
    assert_eq!(result.target_name, "Bass");
    assert!(output.exists());
    assert!(harness.store.fetch_by_path(&output).unwrap().is_none());
}
