//! Path canonicalization for store keys
//!
//! Store records are keyed by path, so every path that reaches the store goes
//! through [`canonicalize_root`] or [`normalize`] first. macOS hands back
//! decomposed file names; both forms must map to one key.

use std::io;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Resolve a project root on disk and normalize it
pub fn canonicalize_root(path: &Path) -> io::Result<PathBuf> {
    let canonical = dunce::canonicalize(path)?;
    Ok(normalize(&canonical))
}

/// NFC-normalize a path and strip trailing separators (except the root)
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized: String = path.to_string_lossy().nfc().collect();
    while normalized.len() > 1 && (normalized.ends_with('/') || normalized.ends_with('\\')) {
        normalized.pop();
    }
    PathBuf::from(normalized)
}
