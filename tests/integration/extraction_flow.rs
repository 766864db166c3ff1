//! Extraction flow: carve tracks out of real containers and read them back

use crate::integration::test_utils::*;
use sordello::error::{ExtractionError, ParseError};
use sordello::extract::extract_file;
use sordello::live_set::parser::parse_file;
use sordello::live_set::TrackKind;
use tempfile::TempDir;

#[test]
fn test_extract_group_keeps_nested_closure_and_returns() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("Song.als");
    let output = temp.path().join("out/Drums.als");
    write_set(&source, &sample_tracks());

    let result = extract_file(&source, 10, &output).unwrap();
    assert_eq!(result.target_kind, TrackKind::Group);
    assert_eq!(result.target_name, "Drums");
    assert_eq!(result.returns_carried, 1);
    assert_eq!(result.tracks_extracted, 6);
    assert_eq!(result.output_path, output);

    let parsed = parse_file(&output).unwrap();
    let ids: Vec<i64> = parsed.tracks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![10, 11, 12, 13, 14, 30]);

    let drums = parsed.find(10).unwrap();
    assert!(drums.is_root());
    assert_eq!(parsed.find(14).unwrap().parent_group_id, Some(13));
    assert_eq!(parsed.find(13).unwrap().parent_group_id, Some(10));
    assert!(parsed.find(20).is_none());
    assert_eq!(parsed.format_version.as_deref(), Some("11.3.4"));
}

#[test]
fn test_extract_nested_track_is_rerooted_to_master() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("Song.als");
    let output = temp.path().join("Shaker.als");
    write_set(&source, &sample_tracks());

    let result = extract_file(&source, 14, &output).unwrap();
    assert_eq!(result.target_kind, TrackKind::Audio);
    assert_eq!(result.tracks_extracted, 2);

    let parsed = parse_file(&output).unwrap();
    let shaker = parsed.find(14).unwrap();
    assert!(shaker.is_root());
    let routing = shaker.audio_output.as_ref().unwrap();
    assert_eq!(routing.target, "AudioOut/Master");
    assert!(parsed.warnings.is_empty());
}

#[test]
fn test_extract_leaves_source_untouched() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("Song.als");
    write_set(&source, &sample_tracks());
    let before = std::fs::read(&source).unwrap();

    extract_file(&source, 20, &temp.path().join("Bass.als")).unwrap();
    assert_eq!(std::fs::read(&source).unwrap(), before);
}

#[test]
fn test_extract_missing_track_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("Song.als");
    let output = temp.path().join("Nope.als");
    write_set(&source, &sample_tracks());

    let err = extract_file(&source, 999, &output).unwrap_err();
    assert!(matches!(err, ExtractionError::TrackNotFound(999)));
    assert!(!output.exists());
}

#[test]
fn test_extract_missing_source_is_read_failure() {
    let temp = TempDir::new().unwrap();
    let err = extract_file(
        &temp.path().join("Ghost.als"),
        1,
        &temp.path().join("Out.als"),
    )
    .unwrap_err();
    assert!(matches!(err, ExtractionError::ReadFailure(_)));
}

#[test]
fn test_extract_plain_file_is_invalid_container() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("Bad.als");
    std::fs::write(&source, b"plain text, no gzip here").unwrap();
    let err = extract_file(&source, 1, &temp.path().join("Out.als")).unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::Parse(ParseError::InvalidContainer(_))
    ));
}
