//! Atomic file writes: write to a `.tmp` sibling, then rename over the target.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path`, creating parent directories as needed
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path).map_err(|e| {
        // Clean up temp file on error
        let _ = fs::remove_file(&temp_path);
        e
    })
}

/// Copy `from` to `to` through a temp file
pub fn copy_atomic(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = temp_path_for(to);
    if let Err(e) = fs::copy(from, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, to).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e
    })
}
