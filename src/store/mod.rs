//! File Record Store
//!
//! Persistent record of every Live set occurrence under a project root, plus
//! the track set last parsed from each. The reconciler is the only writer.

pub mod persistence;

pub use persistence::SledProjectStore;

use crate::error::StoreError;
use crate::live_set::TrackRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where a Live set sits in the project layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    /// A set in the project root
    Main,
    /// A set Live wrote into `Backup/`
    Backup,
    /// A whole-set copy under `.sordello/<name>/versions/`
    Version,
    /// A track extraction under `.sordello/<name>/liveSetTracks/<id>/`
    TrackVersion,
}

impl FileCategory {
    pub fn label(self) -> &'static str {
        match self {
            FileCategory::Main => "main",
            FileCategory::Backup => "backup",
            FileCategory::Version => "version",
            FileCategory::TrackVersion => "trackVersion",
        }
    }
}

/// FileRecord: one on-disk Live set known to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Project root this record was discovered under
    pub project: PathBuf,
    pub category: FileCategory,
    pub parent_path: Option<PathBuf>,
    pub source_name: Option<String>,
    pub source_track_id: Option<i64>,
    pub source_track_name: Option<String>,
    /// Seconds since the Unix epoch
    pub last_known_modification_time: Option<f64>,
    pub is_parsed: bool,
    pub format_version_tag: Option<String>,
}

impl FileRecord {
    /// A freshly discovered, unparsed record
    pub fn new(path: PathBuf, project: PathBuf, category: FileCategory) -> Self {
        Self {
            path,
            project,
            category,
            parent_path: None,
            source_name: None,
            source_track_id: None,
            source_track_name: None,
            last_known_modification_time: None,
            is_parsed: false,
            format_version_tag: None,
        }
    }
}

/// Record-level operations the reconciler needs
pub trait ProjectStore: Send + Sync {
    fn insert(&self, record: &FileRecord) -> Result<(), StoreError>;

    /// Update an existing record; fails with `RecordNotFound` otherwise
    fn update(&self, record: &FileRecord) -> Result<(), StoreError>;

    /// Delete a record and its track set
    fn delete(&self, path: &Path) -> Result<(), StoreError>;

    fn fetch_all(&self, project: &Path) -> Result<Vec<FileRecord>, StoreError>;

    fn fetch_main(&self, project: &Path) -> Result<Vec<FileRecord>, StoreError> {
        Ok(self
            .fetch_all(project)?
            .into_iter()
            .filter(|r| r.category == FileCategory::Main)
            .collect())
    }

    fn fetch_by_path(&self, path: &Path) -> Result<Option<FileRecord>, StoreError>;

    /// Insert or overwrite a record together with its parsed tracks
    fn insert_with_tracks(
        &self,
        record: &FileRecord,
        tracks: &[TrackRecord],
    ) -> Result<(), StoreError>;

    fn fetch_tracks(&self, path: &Path) -> Result<Vec<TrackRecord>, StoreError>;

    /// Replace one track (matched by id) in the set stored for `path`
    fn update_track(&self, path: &Path, track: &TrackRecord) -> Result<(), StoreError>;

    /// Drop every record of `project`, then insert `records`
    fn replace_project(&self, project: &Path, records: &[FileRecord]) -> Result<(), StoreError> {
        for existing in self.fetch_all(project)? {
            self.delete(&existing.path)?;
        }
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }
}
