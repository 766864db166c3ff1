//! Wave-based parse scheduling
//!
//! Jobs run in waves of at most `wave_size` blocking parses. Worker tasks
//! only parse; every store write happens on the coordinating task as results
//! arrive, so the store sees a single writer.

use crate::error::{ParseError, StoreError};
use crate::live_set::{LiveSetParser, ParseResult};
use crate::project::reconcile::mtime_advanced;
use crate::store::{FileCategory, FileRecord, ProjectStore};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Parses one file; implementations run on blocking worker threads
pub trait FileParser: Send + Sync + 'static {
    fn parse(&self, path: &Path) -> Result<ParseResult, ParseError>;
}

impl FileParser for LiveSetParser {
    fn parse(&self, path: &Path) -> Result<ParseResult, ParseError> {
        self.parse_file(path)
    }
}

/// Why a file was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobReason {
    New,
    Changed,
    /// Known but never parsed successfully
    Retry,
}

/// One file to parse, carrying the record to write if none is stored yet
#[derive(Debug, Clone)]
pub struct ParseJob {
    pub record: FileRecord,
    pub reason: JobReason,
}

impl ParseJob {
    pub fn new(record: FileRecord, reason: JobReason) -> Self {
        Self { record, reason }
    }

    pub fn path(&self) -> &Path {
        &self.record.path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Parsed,
    Skipped,
    Failed(String),
}

/// Progress after one more job finished
#[derive(Debug, Clone, PartialEq)]
pub struct ParseProgress {
    pub completed: usize,
    pub total: usize,
    pub path: Option<PathBuf>,
    pub outcome: JobOutcome,
}

/// A job whose results were committed
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub record: FileRecord,
    pub reason: JobReason,
    pub track_count: usize,
    pub warnings: usize,
}

/// Hooks invoked on the coordinating task
pub trait ScheduleObserver: Send {
    fn on_progress(&mut self, _progress: &ParseProgress) {}

    /// Called after every job of a wave has been committed
    fn on_wave_complete(&mut self, _store: &dyn ProjectStore, _parsed: &[ParsedFile]) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl ScheduleObserver for NoopObserver {}

/// Totals of one scheduler run
#[derive(Debug, Clone, Default)]
pub struct ScheduleReport {
    pub total: usize,
    pub waves: usize,
    pub parsed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct ParseScheduler {
    parser: Arc<dyn FileParser>,
    wave_size: usize,
    mtime_tolerance: f64,
}

impl ParseScheduler {
    pub fn new(parser: Arc<dyn FileParser>, wave_size: usize, mtime_tolerance: f64) -> Self {
        Self {
            parser,
            wave_size: wave_size.max(1),
            mtime_tolerance,
        }
    }

    pub fn wave_size(&self) -> usize {
        self.wave_size
    }

    /// A stored record that is parsed and whose mtime has not moved needs no work
    fn should_skip(&self, stored: Option<&FileRecord>, job: &ParseJob) -> bool {
        match stored {
            Some(record) => {
                record.is_parsed
                    && !mtime_advanced(
                        record.last_known_modification_time,
                        job.record.last_known_modification_time,
                        self.mtime_tolerance,
                    )
            }
            None => false,
        }
    }

    /// Parse `jobs` wave by wave and commit each result to `store`
    pub async fn run(
        &self,
        store: &dyn ProjectStore,
        jobs: Vec<ParseJob>,
        observer: &mut dyn ScheduleObserver,
    ) -> Result<ScheduleReport, StoreError> {
        let total = jobs.len();
        let mut report = ScheduleReport {
            total,
            ..Default::default()
        };
        let mut completed = 0usize;

        for wave in jobs.chunks(self.wave_size) {
            report.waves += 1;
            let mut tasks = JoinSet::new();
            let mut in_flight: HashSet<PathBuf> = HashSet::new();
            let mut wave_parsed = Vec::new();

            for job in wave {
                let stored = store.fetch_by_path(job.path())?;
                if self.should_skip(stored.as_ref(), job) {
                    completed += 1;
                    debug!(path = %job.path().display(), "Skipping already parsed file");
                    report.skipped.push(job.path().to_path_buf());
                    observer.on_progress(&ParseProgress {
                        completed,
                        total,
                        path: Some(job.path().to_path_buf()),
                        outcome: JobOutcome::Skipped,
                    });
                    continue;
                }

                let parser = Arc::clone(&self.parser);
                let job = job.clone();
                in_flight.insert(job.path().to_path_buf());
                tasks.spawn_blocking(move || {
                    let result = parser.parse(job.path());
                    (job, result)
                });
            }

            debug!(wave = report.waves, jobs = in_flight.len(), "Dispatched parse wave");

            while let Some(joined) = tasks.join_next().await {
                completed += 1;
                let progress = match joined {
                    Ok((job, Ok(result))) => {
                        in_flight.remove(job.path());
                        let parsed = commit(store, &job, &result)?;
                        report.parsed.push(job.path().to_path_buf());
                        let path = job.path().to_path_buf();
                        wave_parsed.push(parsed);
                        ParseProgress {
                            completed,
                            total,
                            path: Some(path),
                            outcome: JobOutcome::Parsed,
                        }
                    }
                    Ok((job, Err(e))) => {
                        in_flight.remove(job.path());
                        warn!(path = %job.path().display(), error = %e, "Failed to parse Live set");
                        report.failed.push((job.path().to_path_buf(), e.to_string()));
                        ParseProgress {
                            completed,
                            total,
                            path: Some(job.path().to_path_buf()),
                            outcome: JobOutcome::Failed(e.to_string()),
                        }
                    }
                    Err(join_error) => {
                        warn!(error = %join_error, "Parse worker did not complete");
                        ParseProgress {
                            completed,
                            total,
                            path: None,
                            outcome: JobOutcome::Failed(join_error.to_string()),
                        }
                    }
                };
                observer.on_progress(&progress);
            }

            // Workers that panicked never reported their path
            let mut lost: Vec<PathBuf> = in_flight.into_iter().collect();
            lost.sort();
            for path in lost {
                report.failed.push((path, "parse worker panicked".to_string()));
            }

            observer.on_wave_complete(store, &wave_parsed);
        }

        info!(
            total,
            parsed = report.parsed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            waves = report.waves,
            "Parse schedule complete"
        );
        Ok(report)
    }
}

/// Write one parse result: tracks, parsed flag, format tag, observed mtime
fn commit(store: &dyn ProjectStore, job: &ParseJob, result: &ParseResult) -> Result<ParsedFile, StoreError> {
    let mut record = store
        .fetch_by_path(job.path())?
        .unwrap_or_else(|| job.record.clone());
    record.is_parsed = true;
    record.format_version_tag = result.format_version.clone();
    record.last_known_modification_time = job.record.last_known_modification_time;
    store.insert_with_tracks(&record, &result.tracks)?;

    debug!(
        path = %record.path.display(),
        tracks = result.tracks.len(),
        category = record.category.label(),
        "Committed parse result"
    );
    Ok(ParsedFile {
        track_count: result.tracks.len(),
        warnings: result.warnings.len(),
        reason: job.reason,
        record,
    })
}

/// Parsed main files whose content changed since the last scan
pub fn changed_main_files(parsed: &[ParsedFile]) -> impl Iterator<Item = &ParsedFile> {
    parsed
        .iter()
        .filter(|p| p.reason == JobReason::Changed && p.record.category == FileCategory::Main)
}
