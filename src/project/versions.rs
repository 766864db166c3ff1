//! Whole-set versions under `.sordello/<Name>/versions/`

use crate::atomic::copy_atomic;
use crate::error::ApiError;
use crate::project::layout::{base_name, HistoryLayout};
use crate::project::scan::modified_seconds;
use crate::project::scheduler::{changed_main_files, ParseProgress, ParsedFile, ScheduleObserver};
use crate::store::{FileCategory, FileRecord, ProjectStore};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Copies main sets into the history tree and records the copies
pub struct Versioner {
    layout: HistoryLayout,
}

impl Versioner {
    pub fn new(layout: HistoryLayout) -> Self {
        Self { layout }
    }

    /// Copy `main` to a fresh version path and insert its record.
    ///
    /// The copy inherits the main file's parsed tracks, so it is stored as
    /// parsed and the next scan skips it.
    pub fn create_version(
        &self,
        store: &dyn ProjectStore,
        main: &FileRecord,
        now: DateTime<Utc>,
    ) -> Result<FileRecord, ApiError> {
        let target = self.layout.new_version_path(&main.path, now);
        copy_atomic(&main.path, &target)?;

        let mut record = FileRecord::new(target, main.project.clone(), FileCategory::Version);
        record.parent_path = Some(main.path.clone());
        record.source_name = Some(base_name(&main.path));
        record.last_known_modification_time = modified_seconds(&record.path);
        record.is_parsed = main.is_parsed;
        record.format_version_tag = main.format_version_tag.clone();

        let tracks = store.fetch_tracks(&main.path)?;
        store.insert_with_tracks(&record, &tracks)?;
        info!(
            main = %main.path.display(),
            version = %record.path.display(),
            "Created version"
        );
        Ok(record)
    }
}

/// Schedule observer that versions changed main sets after each wave
pub struct AutoVersioner<'a> {
    versioner: &'a Versioner,
    inner: &'a mut dyn ScheduleObserver,
    pub created: Vec<FileRecord>,
}

impl<'a> AutoVersioner<'a> {
    pub fn new(versioner: &'a Versioner, inner: &'a mut dyn ScheduleObserver) -> Self {
        Self {
            versioner,
            inner,
            created: Vec::new(),
        }
    }
}

impl ScheduleObserver for AutoVersioner<'_> {
    fn on_progress(&mut self, progress: &ParseProgress) {
        self.inner.on_progress(progress);
    }

    fn on_wave_complete(&mut self, store: &dyn ProjectStore, parsed: &[ParsedFile]) {
        for file in changed_main_files(parsed) {
            match self.versioner.create_version(store, &file.record, Utc::now()) {
                Ok(record) => self.created.push(record),
                Err(e) => warn!(path = %file.record.path.display(), error = %e, "Failed to create version"),
            }
        }
        self.inner.on_wave_complete(store, parsed);
    }
}
