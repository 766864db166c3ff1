//! Project roots: layout, discovery, reconciliation, parse scheduling, versions

pub mod layout;
pub mod reconcile;
pub mod scan;
pub mod scheduler;
pub mod versions;

pub use layout::{HistoryLayout, Placement, HISTORY_DIR};
pub use reconcile::{classify, ProjectReconciler, ReconcileReport, ScanDiff, ScanMode};
pub use scan::{DiscoveredFile, ProjectScanner, ScanOptions};
pub use scheduler::{
    FileParser, JobOutcome, JobReason, NoopObserver, ParseJob, ParseProgress, ParseScheduler,
    ParsedFile, ScheduleObserver, ScheduleReport,
};
pub use versions::{AutoVersioner, Versioner};
