//! Project service
//!
//! Entry point the CLI (or a host application) talks to. Owns the store, the
//! access capability, and the reconciler; every filesystem touch happens
//! inside an [`AccessScope`].

use crate::access::{AccessCapability, AccessScope, UnrestrictedAccess};
use crate::config::SordelloConfig;
use crate::error::{ApiError, ParseError};
use crate::extract::{self, ExtractionResult};
use crate::live_set::{LiveSetParser, TrackKind, TrackRecord};
use crate::paths::{canonicalize_root, normalize};
use crate::project::layout::base_name;
use crate::project::scan::modified_seconds;
use crate::project::{
    FileParser, HistoryLayout, ProjectReconciler, ReconcileReport, ScheduleObserver,
};
use crate::store::{FileCategory, FileRecord, ProjectStore, SledProjectStore};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ProjectService {
    store: Arc<dyn ProjectStore>,
    access: Arc<dyn AccessCapability>,
    parser: Arc<dyn FileParser>,
    reconciler: ProjectReconciler,
}

impl ProjectService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        access: Arc<dyn AccessCapability>,
        parser: Arc<dyn FileParser>,
        config: &SordelloConfig,
    ) -> Self {
        let reconciler = ProjectReconciler::new(
            Arc::clone(&store),
            Arc::clone(&access),
            Arc::clone(&parser),
            config.reconcile.clone(),
        );
        Self {
            store,
            access,
            parser,
            reconciler,
        }
    }

    /// Open the sled store named by `config` with unrestricted access
    pub fn open(config: &SordelloConfig) -> Result<Self, ApiError> {
        let store = SledProjectStore::new(&config.storage.store_path)?;
        debug!(store = %config.storage.store_path.display(), "Opened record store");
        Ok(Self::new(
            Arc::new(store),
            Arc::new(UnrestrictedAccess::default()),
            Arc::new(LiveSetParser),
            config,
        ))
    }

    pub fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    pub async fn reconcile(&self, root: &Path, force_full: bool) -> Result<ReconcileReport, ApiError> {
        self.reconciler.reconcile(root, force_full).await
    }

    pub async fn reconcile_with(
        &self,
        root: &Path,
        force_full: bool,
        observer: &mut dyn ScheduleObserver,
    ) -> Result<ReconcileReport, ApiError> {
        self.reconciler.reconcile_with(root, force_full, observer).await
    }

    /// Every record known under `root`, sorted by path
    pub fn files(&self, root: &Path) -> Result<Vec<FileRecord>, ApiError> {
        let root = resolve_root(root)?;
        let mut records = self.store.fetch_all(&root)?;
        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    /// Tracks of one set: from the store when it holds a parsed record,
    /// otherwise parsed straight from disk
    pub fn tracks(&self, set_path: &Path) -> Result<Vec<TrackRecord>, ApiError> {
        let path = resolve_file(set_path)?;
        if let Some(record) = self.store.fetch_by_path(&path)? {
            if record.is_parsed {
                return Ok(self.store.fetch_tracks(&path)?);
            }
        }
        let scope = AccessScope::begin(self.access.as_ref(), parent_of(&path))?;
        let parsed = self.parser.parse(&path);
        scope.end()?;
        Ok(parsed?.tracks)
    }

    /// Extract a track into an explicit output file
    pub fn extract(
        &self,
        source: &Path,
        track_id: i64,
        output: &Path,
    ) -> Result<ExtractionResult, ApiError> {
        // A missing source is reported by the extractor as a read failure
        let source = resolve_file(source).unwrap_or_else(|_| source.to_path_buf());
        let scope = AccessScope::begin(self.access.as_ref(), parent_of(&source))?;
        let result = extract::extract_file(&source, track_id, output);
        scope.end()?;
        Ok(result?)
    }

    /// Extract a track into the project's history and record it.
    ///
    /// The new file lands at `.sordello/<Name>/liveSetTracks/<id>/<ts>.als`
    /// and is stored as a parsed track version. When the target is a group,
    /// the main set's stored track gets a subproject link to the new file.
    pub fn extract_track_version(&self, main_path: &Path, track_id: i64) -> Result<FileRecord, ApiError> {
        let main = resolve_file(main_path)?;
        let root = parent_of(&main).to_path_buf();
        let layout = HistoryLayout::new(&root);

        let scope = AccessScope::begin(self.access.as_ref(), &root)?;
        let result = self.extract_into_history(&layout, &main, track_id);
        scope.end()?;
        result
    }

    fn extract_into_history(
        &self,
        layout: &HistoryLayout,
        main: &Path,
        track_id: i64,
    ) -> Result<FileRecord, ApiError> {
        let output = layout.new_track_path(main, track_id, Utc::now());
        let extraction = extract::extract_file(main, track_id, &output)?;
        let parsed = self.parser.parse(&output)?;

        let mut record = FileRecord::new(output.clone(), layout.root().to_path_buf(), FileCategory::TrackVersion);
        record.parent_path = Some(main.to_path_buf());
        record.source_name = Some(base_name(main));
        record.source_track_id = Some(track_id);
        record.source_track_name = Some(extraction.target_name.clone());
        record.last_known_modification_time = modified_seconds(&output);
        record.is_parsed = true;
        record.format_version_tag = parsed.format_version.clone();
        self.store.insert_with_tracks(&record, &parsed.tracks)?;

        if extraction.target_kind == TrackKind::Group {
            self.link_subproject(main, track_id, &output)?;
        }

        info!(
            main = %main.display(),
            track_id,
            output = %output.display(),
            "Recorded track version"
        );
        Ok(record)
    }

    fn link_subproject(&self, main: &Path, track_id: i64, output: &Path) -> Result<(), ApiError> {
        let tracks = self.store.fetch_tracks(main)?;
        match tracks.into_iter().find(|t| t.id == track_id) {
            Some(mut track) => {
                track.subproject_link = Some(output.to_path_buf());
                self.store.update_track(main, &track)?;
            }
            None => debug!(main = %main.display(), track_id, "Main set not reconciled; no link stored"),
        }
        Ok(())
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf, ApiError> {
    canonicalize_root(root).map_err(|_| ApiError::ProjectNotFound(root.to_path_buf()))
}

fn resolve_file(path: &Path) -> Result<PathBuf, ApiError> {
    match dunce::canonicalize(path) {
        Ok(resolved) => Ok(normalize(&resolved)),
        Err(_) => Err(ParseError::NotFound(path.to_path_buf()).into()),
    }
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(path)
}
