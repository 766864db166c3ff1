//! Persistence layer for the file record store

use crate::error::StoreError;
use crate::live_set::TrackRecord;
use crate::store::{FileRecord, ProjectStore};
use std::path::Path;

const FILES_TREE: &str = "files";
const TRACKS_TREE: &str = "tracks";

/// Sled-based implementation of ProjectStore
///
/// Records are keyed by path in the `files` tree; the parsed track set of
/// each file lives under the same key in the `tracks` tree.
pub struct SledProjectStore {
    db: sled::Db,
    files: sled::Tree,
    tracks: sled::Tree,
}

impl SledProjectStore {
    /// Open (or create) a store at the given directory
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let files = db.open_tree(FILES_TREE)?;
        let tracks = db.open_tree(TRACKS_TREE)?;
        Ok(Self { db, files, tracks })
    }

    /// Temporary in-memory store, dropped with the handle
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        let files = db.open_tree(FILES_TREE)?;
        let tracks = db.open_tree(TRACKS_TREE)?;
        Ok(Self { db, files, tracks })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn key(path: &Path) -> Vec<u8> {
        path.to_string_lossy().as_bytes().to_vec()
    }
}

impl ProjectStore for SledProjectStore {
    fn insert(&self, record: &FileRecord) -> Result<(), StoreError> {
        let value = bincode::serialize(record)?;
        self.files.insert(Self::key(&record.path), value)?;
        Ok(())
    }

    fn update(&self, record: &FileRecord) -> Result<(), StoreError> {
        let key = Self::key(&record.path);
        if !self.files.contains_key(&key)? {
            return Err(StoreError::RecordNotFound(record.path.clone()));
        }
        self.files.insert(key, bincode::serialize(record)?)?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), StoreError> {
        let key = Self::key(path);
        self.files.remove(&key)?;
        self.tracks.remove(&key)?;
        Ok(())
    }

    fn fetch_all(&self, project: &Path) -> Result<Vec<FileRecord>, StoreError> {
        let mut records = Vec::new();
        for item in self.files.iter() {
            let (_, value) = item?;
            let record: FileRecord = bincode::deserialize(&value)?;
            if record.project == project {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn fetch_by_path(&self, path: &Path) -> Result<Option<FileRecord>, StoreError> {
        match self.files.get(Self::key(path))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn insert_with_tracks(
        &self,
        record: &FileRecord,
        tracks: &[TrackRecord],
    ) -> Result<(), StoreError> {
        let key = Self::key(&record.path);
        let record_value = bincode::serialize(record)?;
        let tracks_value = bincode::serialize(tracks)?;
        self.files.insert(key.clone(), record_value)?;
        self.tracks.insert(key, tracks_value)?;
        Ok(())
    }

    fn fetch_tracks(&self, path: &Path) -> Result<Vec<TrackRecord>, StoreError> {
        match self.tracks.get(Self::key(path))? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(Vec::new()),
        }
    }

    fn update_track(&self, path: &Path, track: &TrackRecord) -> Result<(), StoreError> {
        let mut tracks = self.fetch_tracks(path)?;
        let Some(slot) = tracks.iter_mut().find(|t| t.id == track.id) else {
            return Err(StoreError::RecordNotFound(path.to_path_buf()));
        };
        *slot = track.clone();
        self.tracks
            .insert(Self::key(path), bincode::serialize(&tracks)?)?;
        Ok(())
    }
}
