//! Filesystem discovery of Live sets under a project root

use crate::live_set::has_set_extension;
use crate::paths::normalize;
use crate::project::layout::{HistoryLayout, Placement};
use crate::store::{FileCategory, FileRecord};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;
use walkdir::WalkDir;

/// A Live set found on disk, not yet reconciled with the store
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub placement: Placement,
    /// Seconds since the Unix epoch; `None` when the platform has no mtime
    pub modified: Option<f64>,
}

impl DiscoveredFile {
    pub fn category(&self) -> FileCategory {
        self.placement.category
    }

    /// Fresh unparsed record for this file
    pub fn to_record(&self, project: &Path) -> FileRecord {
        let mut record = FileRecord::new(self.path.clone(), project.to_path_buf(), self.category());
        record.parent_path = self.placement.parent_path.clone();
        record.source_name = self.placement.source_name.clone();
        record.source_track_id = self.placement.source_track_id;
        record.last_known_modification_time = self.modified;
        record
    }
}

/// Scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub follow_symlinks: bool,
}

/// Enumerates main sets, backups, and history entries of one project
pub struct ProjectScanner {
    layout: HistoryLayout,
    options: ScanOptions,
}

impl ProjectScanner {
    /// `root` must already be canonical
    pub fn new(root: PathBuf, options: ScanOptions) -> Self {
        Self {
            layout: HistoryLayout::new(root),
            options,
        }
    }

    pub fn layout(&self) -> &HistoryLayout {
        &self.layout
    }

    /// Discovered sets sorted by path
    pub fn scan(&self) -> io::Result<Vec<DiscoveredFile>> {
        let mut found = Vec::new();
        self.collect(self.layout.root(), 1, &mut found)?;
        self.collect(&self.layout.backup_dir(), 1, &mut found)?;
        // versions/<ts>.als is depth 3, liveSetTracks/<id>/<ts>.als depth 4
        self.collect(&self.layout.history_dir(), 4, &mut found)?;
        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }

    fn collect(&self, dir: &Path, max_depth: usize, found: &mut Vec<DiscoveredFile>) -> io::Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        let walker = WalkDir::new(dir)
            .follow_links(self.options.follow_symlinks)
            .min_depth(1)
            .max_depth(max_depth);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // The directory itself is unreadable; nothing below it can be found
                Err(e) if e.depth() == 0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("Failed to walk directory {}: {}", dir.display(), e),
                    ));
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() && !(self.options.follow_symlinks && entry.path().is_file()) {
                continue;
            }
            if !has_set_extension(entry.path()) || is_hidden_file(entry.path()) {
                continue;
            }
            let path = normalize(entry.path());
            let Some(placement) = self.layout.place(&path) else {
                continue;
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping file without metadata");
                    continue;
                }
            };
            found.push(DiscoveredFile {
                path,
                placement,
                modified: metadata.modified().ok().and_then(epoch_seconds),
            });
        }
        Ok(())
    }
}

/// Dotfiles such as `._Song.als` resource forks and our `.tmp` writes
fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

pub fn epoch_seconds(time: SystemTime) -> Option<f64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}

/// Modification time of a file on disk, in epoch seconds
pub fn modified_seconds(path: &Path) -> Option<f64> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(epoch_seconds)
}
