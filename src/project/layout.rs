//! Project directory layout
//!
//! ```text
//! <root>/<Name>.als                                     main sets
//! <root>/Backup/<Name> [<stamp>].als                    Live's own backups
//! <root>/.sordello/<Name>/versions/<ts>.als             whole-set versions
//! <root>/.sordello/<Name>/liveSetTracks/<id>/<ts>.als   track extractions
//! ```

use crate::live_set::{has_set_extension, FILE_EXTENSION};
use crate::store::FileCategory;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};

/// Hidden history subtree under each project root
pub const HISTORY_DIR: &str = ".sordello";
pub const VERSIONS_DIR: &str = "versions";
pub const TRACKS_DIR: &str = "liveSetTracks";
/// Directory Live writes its own backups into
pub const BACKUP_DIR: &str = "Backup";
/// Sortable, filesystem-safe, one-second resolution
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Where a discovered set sits and what it derives from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub category: FileCategory,
    pub parent_path: Option<PathBuf>,
    pub source_name: Option<String>,
    pub source_track_id: Option<i64>,
}

/// Path arithmetic for one project root
#[derive(Debug, Clone)]
pub struct HistoryLayout {
    root: PathBuf,
}

impl HistoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    /// `.sordello/<Name>` for a main set
    pub fn set_dir(&self, main: &Path) -> PathBuf {
        self.history_dir().join(base_name(main))
    }

    pub fn version_dir(&self, main: &Path) -> PathBuf {
        self.set_dir(main).join(VERSIONS_DIR)
    }

    pub fn track_dir(&self, main: &Path, track_id: i64) -> PathBuf {
        self.set_dir(main).join(TRACKS_DIR).join(track_id.to_string())
    }

    /// Fresh, not yet existing path for a whole-set version
    pub fn new_version_path(&self, main: &Path, now: DateTime<Utc>) -> PathBuf {
        unique_timestamped(&self.version_dir(main), now)
    }

    /// Fresh, not yet existing path for a track extraction
    pub fn new_track_path(&self, main: &Path, track_id: i64, now: DateTime<Utc>) -> PathBuf {
        unique_timestamped(&self.track_dir(main, track_id), now)
    }

    /// The main set a history entry belongs to
    pub fn main_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, FILE_EXTENSION))
    }

    /// Classify a Live set path relative to this root.
    ///
    /// Returns `None` for paths outside the layout (nested project folders,
    /// non-set files, unexpected history depth).
    pub fn place(&self, path: &Path) -> Option<Placement> {
        if !has_set_extension(path) {
            return None;
        }
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        match parts.as_slice() {
            [_file] => Some(Placement {
                category: FileCategory::Main,
                parent_path: None,
                source_name: None,
                source_track_id: None,
            }),
            [dir, file] if dir == BACKUP_DIR => {
                let name = backup_source_name(stem(file));
                Some(Placement {
                    category: FileCategory::Backup,
                    parent_path: Some(self.main_path(&name)),
                    source_name: Some(name),
                    source_track_id: None,
                })
            }
            [history, name, versions, _file] if history == HISTORY_DIR && versions == VERSIONS_DIR => {
                Some(Placement {
                    category: FileCategory::Version,
                    parent_path: Some(self.main_path(name)),
                    source_name: Some(name.clone()),
                    source_track_id: None,
                })
            }
            [history, name, tracks, id, _file] if history == HISTORY_DIR && tracks == TRACKS_DIR => {
                Some(Placement {
                    category: FileCategory::TrackVersion,
                    parent_path: Some(self.main_path(name)),
                    source_name: Some(name.clone()),
                    source_track_id: id.parse().ok(),
                })
            }
            _ => None,
        }
    }
}

/// File stem of a set path (`Song` for `Song.als`)
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stem(file: &str) -> &str {
    file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file)
}

/// Strip the ` [timestamp]` suffix Live appends to backup names
pub fn backup_source_name(stem: &str) -> String {
    let trimmed = stem.trim_end();
    if trimmed.ends_with(']') {
        if let Some(open) = trimmed.rfind(" [") {
            return trimmed[..open].to_string();
        }
    }
    trimmed.to_string()
}

/// `<dir>/<ts>.als`, or `<dir>/<ts>-N.als` when that one exists
pub fn unique_timestamped(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let first = dir.join(format!("{}.{}", stamp, FILE_EXTENSION));
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| dir.join(format!("{}-{}.{}", stamp, n, FILE_EXTENSION)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
