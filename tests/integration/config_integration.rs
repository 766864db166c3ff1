//! Config integration: project config files drive the CLI run context

use crate::integration::test_utils::*;
use sordello::cli::{load_config, Commands, RunContext};
use sordello::error::ApiError;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn isolate_env(temp: &TempDir) {
    std::env::set_var("XDG_CONFIG_HOME", temp.path().join("no-global"));
    for (name, _) in std::env::vars() {
        if name.starts_with("SORDELLO__") {
            std::env::remove_var(name);
        }
    }
}

fn write_project_config(root: &Path, contents: &str) {
    let dir = root.join(".sordello");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_project_config_selects_store_and_wave_size() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    isolate_env(&temp);
    let root = project_root(&temp, "Configured");
    let store = temp.path().join("store");
    write_project_config(
        &root,
        &format!(
            "[storage]\nstore_path = {:?}\n\n[reconcile]\nwave_size = 2\nauto_version_main = false\n",
            store.to_str().unwrap()
        ),
    );

    let config = load_config(&root, None).unwrap();
    assert_eq!(config.storage.store_path, store);
    assert_eq!(config.reconcile.wave_size, 2);
    assert!(!config.reconcile.auto_version_main);
}

#[test]
fn test_invalid_project_config_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    isolate_env(&temp);
    let root = project_root(&temp, "Invalid");
    write_project_config(&root, "[reconcile]\nwave_size = 0\nmtime_tolerance_secs = -2.0\n");

    let err = load_config(&root, None).unwrap_err();
    match err {
        ApiError::ConfigError(message) => {
            assert!(message.contains("wave_size"));
            assert!(message.contains("mtime_tolerance_secs"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_explicit_config_file_must_exist() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    isolate_env(&temp);
    let root = project_root(&temp, "Explicit");
    let err = load_config(&root, Some(&temp.path().join("missing.toml"))).unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[test]
fn test_run_context_executes_commands_end_to_end() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    isolate_env(&temp);
    let root = project_root(&temp, "Session");
    write_set(&root.join("Song.als"), &sample_tracks());
    write_project_config(
        &root,
        &format!(
            "[storage]\nstore_path = {:?}\n",
            temp.path().join("store").to_str().unwrap()
        ),
    );

    let config = load_config(&root, None).unwrap();
    let context = RunContext::new(config).unwrap();

    let scan = context
        .execute(&Commands::Scan {
            root: root.clone(),
            full: false,
        })
        .unwrap();
    assert!(scan.contains("Discovered: 1"));
    assert!(scan.contains("Parsed: 1"));

    let files = context
        .execute(&Commands::Files {
            root: root.clone(),
            format: "json".to_string(),
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&files).unwrap();
    assert_eq!(value["files"][0]["category"], "main");
    assert_eq!(value["files"][0]["is_parsed"], true);

    let tracks = context
        .execute(&Commands::Tracks {
            file: root.join("Song.als"),
            format: "json".to_string(),
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&tracks).unwrap();
    assert_eq!(value["tracks"].as_array().unwrap().len(), sample_tracks().len());
    assert_eq!(value["tracks"][0]["name"], "Drums");
    assert_eq!(value["tracks"][4]["depth"], 2);

    let extracted = context
        .execute(&Commands::Extract {
            file: root.join("Song.als"),
            track_id: 13,
            output: None,
        })
        .unwrap();
    assert!(extracted.contains("Extracted 'Perc'"));
    assert!(root.join(".sordello/Song/liveSetTracks/13").is_dir());

    let err = context
        .execute(&Commands::Extract {
            file: root.join("Song.als"),
            track_id: 404,
            output: Some(temp.path().join("x.als")),
        })
        .unwrap_err();
    assert_eq!(
        sordello::cli::map_error(&err),
        "No track with id 404 in this set"
    );
}
