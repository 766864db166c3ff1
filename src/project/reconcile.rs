//! Project reconciliation
//!
//! Brings the store in line with what is on disk under one project root:
//! a full scan rebuilds the record set, an incremental scan applies only the
//! difference. Parsing is handed to the [`ParseScheduler`].

use crate::access::{AccessCapability, AccessScope};
use crate::config::ReconcileConfig;
use crate::error::ApiError;
use crate::paths::canonicalize_root;
use crate::project::layout::HistoryLayout;
use crate::project::scan::{DiscoveredFile, ProjectScanner, ScanOptions};
use crate::project::scheduler::{
    FileParser, JobReason, NoopObserver, ParseJob, ParseScheduler, ScheduleObserver, ScheduleReport,
};
use crate::project::versions::{AutoVersioner, Versioner};
use crate::store::{FileRecord, ProjectStore};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// True when `observed` differs from `recorded` by more than `tolerance`.
///
/// A file with no recorded mtime counts as changed once one is observed;
/// a file whose mtime cannot be read never does.
pub fn mtime_advanced(recorded: Option<f64>, observed: Option<f64>, tolerance: f64) -> bool {
    match (recorded, observed) {
        (Some(recorded), Some(observed)) => (observed - recorded).abs() > tolerance,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Full,
    Incremental,
}

/// Disk versus store for one project
#[derive(Debug, Clone, Default)]
pub struct ScanDiff {
    pub new: Vec<DiscoveredFile>,
    pub changed: Vec<DiscoveredFile>,
    /// Unchanged on disk but never parsed successfully
    pub retry: Vec<DiscoveredFile>,
    pub deleted: Vec<PathBuf>,
    pub unchanged: usize,
}

impl ScanDiff {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.changed.is_empty() && self.retry.is_empty() && self.deleted.is_empty()
    }
}

/// Compare discovered files against the prior record set
pub fn classify(discovered: &[DiscoveredFile], prior: &[FileRecord], tolerance: f64) -> ScanDiff {
    let known: HashMap<&Path, &FileRecord> = prior.iter().map(|r| (r.path.as_path(), r)).collect();
    let seen: HashSet<&Path> = discovered.iter().map(|d| d.path.as_path()).collect();
    let mut diff = ScanDiff::default();

    for file in discovered {
        match known.get(file.path.as_path()) {
            None => diff.new.push(file.clone()),
            Some(record) => {
                if mtime_advanced(record.last_known_modification_time, file.modified, tolerance) {
                    diff.changed.push(file.clone());
                } else if !record.is_parsed {
                    diff.retry.push(file.clone());
                } else {
                    diff.unchanged += 1;
                }
            }
        }
    }

    let mut deleted: Vec<PathBuf> = prior
        .iter()
        .filter(|r| !seen.contains(r.path.as_path()))
        .map(|r| r.path.clone())
        .collect();
    deleted.sort();
    diff.deleted = deleted;
    diff
}

/// Outcome of one reconcile
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub root: PathBuf,
    pub mode: ScanMode,
    pub discovered: usize,
    pub new: usize,
    pub changed: usize,
    pub retried: usize,
    pub deleted: usize,
    pub schedule: ScheduleReport,
    pub versions_created: Vec<PathBuf>,
}

pub struct ProjectReconciler {
    store: Arc<dyn ProjectStore>,
    access: Arc<dyn AccessCapability>,
    scheduler: ParseScheduler,
    config: ReconcileConfig,
}

impl ProjectReconciler {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        access: Arc<dyn AccessCapability>,
        parser: Arc<dyn FileParser>,
        config: ReconcileConfig,
    ) -> Self {
        let scheduler = ParseScheduler::new(parser, config.wave_size, config.mtime_tolerance_secs);
        Self {
            store,
            access,
            scheduler,
            config,
        }
    }

    pub async fn reconcile(&self, root: &Path, force_full: bool) -> Result<ReconcileReport, ApiError> {
        self.reconcile_with(root, force_full, &mut NoopObserver).await
    }

    /// Reconcile `root`, reporting per-file progress to `observer`.
    ///
    /// Falls back to a full scan when the store holds nothing for the root.
    pub async fn reconcile_with(
        &self,
        root: &Path,
        force_full: bool,
        observer: &mut dyn ScheduleObserver,
    ) -> Result<ReconcileReport, ApiError> {
        let root = canonicalize_root(root).map_err(|_| ApiError::ProjectNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(ApiError::ProjectNotFound(root));
        }

        let scope = AccessScope::begin(self.access.as_ref(), &root)?;
        let result = self.run(&root, force_full, observer).await;
        scope.end()?;
        result
    }

    async fn run(
        &self,
        root: &Path,
        force_full: bool,
        observer: &mut dyn ScheduleObserver,
    ) -> Result<ReconcileReport, ApiError> {
        let scanner = ProjectScanner::new(
            root.to_path_buf(),
            ScanOptions {
                follow_symlinks: self.config.follow_symlinks,
            },
        );
        let discovered = scanner.scan()?;
        let prior = self.store.fetch_all(root)?;
        let mode = if force_full || prior.is_empty() {
            ScanMode::Full
        } else {
            ScanMode::Incremental
        };
        debug!(root = %root.display(), ?mode, discovered = discovered.len(), "Scanned project");

        let (jobs, new, changed, retried, deleted) = match mode {
            ScanMode::Full => {
                let records: Vec<FileRecord> = discovered.iter().map(|d| d.to_record(root)).collect();
                self.store.replace_project(root, &records)?;
                let jobs: Vec<ParseJob> = records
                    .into_iter()
                    .map(|r| ParseJob::new(r, JobReason::New))
                    .collect();
                let count = jobs.len();
                (jobs, count, 0, 0, 0)
            }
            ScanMode::Incremental => {
                let diff = classify(&discovered, &prior, self.config.mtime_tolerance_secs);
                self.apply(root, &diff)?
            }
        };

        let versioner = Versioner::new(HistoryLayout::new(root));
        let (schedule, versions_created) = if self.config.auto_version_main {
            let mut auto = AutoVersioner::new(&versioner, observer);
            let schedule = self.scheduler.run(self.store.as_ref(), jobs, &mut auto).await?;
            let created = auto.created.into_iter().map(|r| r.path).collect();
            (schedule, created)
        } else {
            let schedule = self.scheduler.run(self.store.as_ref(), jobs, observer).await?;
            (schedule, Vec::new())
        };

        let report = ReconcileReport {
            root: root.to_path_buf(),
            mode,
            discovered: discovered.len(),
            new,
            changed,
            retried,
            deleted,
            schedule,
            versions_created,
        };
        info!(
            root = %root.display(),
            ?mode,
            discovered = report.discovered,
            new = report.new,
            changed = report.changed,
            deleted = report.deleted,
            failed = report.schedule.failed.len(),
            "Reconciled project"
        );
        Ok(report)
    }

    /// Write the structural part of an incremental diff and build its jobs
    fn apply(
        &self,
        root: &Path,
        diff: &ScanDiff,
    ) -> Result<(Vec<ParseJob>, usize, usize, usize, usize), ApiError> {
        for path in &diff.deleted {
            self.store.delete(path)?;
            debug!(path = %path.display(), "Removed deleted file");
        }

        let mut jobs = Vec::with_capacity(diff.new.len() + diff.changed.len() + diff.retry.len());
        for file in &diff.new {
            let record = file.to_record(root);
            self.store.insert(&record)?;
            jobs.push(ParseJob::new(record, JobReason::New));
        }
        for file in &diff.changed {
            // Keep provenance and old tracks; the record is unparsed until this parse lands
            let mut record = self
                .store
                .fetch_by_path(&file.path)?
                .unwrap_or_else(|| file.to_record(root));
            record.is_parsed = false;
            record.last_known_modification_time = file.modified;
            self.store.insert(&record)?;
            jobs.push(ParseJob::new(record, JobReason::Changed));
        }
        for file in &diff.retry {
            jobs.push(ParseJob::new(file.to_record(root), JobReason::Retry));
        }

        Ok((
            jobs,
            diff.new.len(),
            diff.changed.len(),
            diff.retry.len(),
            diff.deleted.len(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::layout::Placement;
    use crate::store::FileCategory;

    fn discovered(path: &str, modified: f64) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from(path),
            placement: Placement {
                category: FileCategory::Main,
                parent_path: None,
                source_name: None,
                source_track_id: None,
            },
            modified: Some(modified),
        }
    }

    fn stored(path: &str, modified: f64, parsed: bool) -> FileRecord {
        let mut record = FileRecord::new(PathBuf::from(path), PathBuf::from("/p"), FileCategory::Main);
        record.last_known_modification_time = Some(modified);
        record.is_parsed = parsed;
        record
    }

    #[test]
    fn test_mtime_tolerance_is_strict() {
        assert!(!mtime_advanced(Some(100.0), Some(101.0), 1.0));
        assert!(mtime_advanced(Some(100.0), Some(101.5), 1.0));
        assert!(mtime_advanced(Some(100.0), Some(98.0), 1.0));
        assert!(mtime_advanced(None, Some(1.0), 1.0));
        assert!(!mtime_advanced(Some(1.0), None, 1.0));
    }

    #[test]
    fn test_classify_partitions_files() {
        let disk = vec![
            discovered("/p/Changed.als", 200.0),
            discovered("/p/Fresh.als", 10.0),
            discovered("/p/Same.als", 50.4),
            discovered("/p/Unparsed.als", 70.0),
        ];
        let prior = vec![
            stored("/p/Changed.als", 100.0, true),
            stored("/p/Gone.als", 1.0, true),
            stored("/p/Same.als", 50.0, true),
            stored("/p/Unparsed.als", 70.0, false),
        ];

        let diff = classify(&disk, &prior, 1.0);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].path, PathBuf::from("/p/Changed.als"));
        assert_eq!(diff.new.len(), 1);
        assert_eq!(diff.new[0].path, PathBuf::from("/p/Fresh.als"));
        assert_eq!(diff.retry.len(), 1);
        assert_eq!(diff.deleted, vec![PathBuf::from("/p/Gone.als")]);
        assert_eq!(diff.unchanged, 1);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_classify_nothing_to_do() {
        let disk = vec![discovered("/p/A.als", 5.0)];
        let prior = vec![stored("/p/A.als", 5.0, true)];
        assert!(classify(&disk, &prior, 1.0).is_empty());
    }
}
