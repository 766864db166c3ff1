//! CLI route: single route table and run context. Dispatches to the project service and presentation.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_extraction, format_files_json, format_files_text, format_reconcile_report,
    format_track_version, format_tracks_json, format_tracks_text,
};
use crate::config::{ConfigLoader, SordelloConfig};
use crate::error::ApiError;
use crate::paths::canonicalize_root;
use crate::project::{JobOutcome, ParseProgress, ReconcileReport, ScheduleObserver};
use crate::service::ProjectService;
use crate::watch::ProjectWatcher;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Logs per-file progress of a reconcile
struct LogProgress;

impl ScheduleObserver for LogProgress {
    fn on_progress(&mut self, progress: &ParseProgress) {
        let path = progress
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match &progress.outcome {
            JobOutcome::Failed(reason) => warn!(
                completed = progress.completed,
                total = progress.total,
                path = %path,
                reason = %reason,
                "Parse failed"
            ),
            outcome => info!(
                completed = progress.completed,
                total = progress.total,
                path = %path,
                ?outcome,
                "Parse progress"
            ),
        }
    }
}

/// Load configuration: an explicit file wins, otherwise the layered loader.
pub fn load_config(project_root: &Path, config_path: Option<&Path>) -> Result<SordelloConfig, ApiError> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load(project_root)?,
    };
    config.validate().map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        ApiError::ConfigError(format!(
            "Configuration validation failed:\n{}",
            messages.join("\n")
        ))
    })?;
    Ok(config)
}

/// Runtime context for CLI execution: configuration, service, and async runtime.
pub struct RunContext {
    config: SordelloConfig,
    service: ProjectService,
    runtime: tokio::runtime::Runtime,
}

impl RunContext {
    pub fn new(config: SordelloConfig) -> Result<Self, ApiError> {
        std::fs::create_dir_all(&config.storage.store_path)?;
        let service = ProjectService::open(&config)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            service,
            runtime,
        })
    }

    pub fn service(&self) -> &ProjectService {
        &self.service
    }

    /// Run one command and return its printable output
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Scan { root, full } => self.handle_scan(root, *full),
            Commands::Files { root, format } => {
                let records = self.service.files(root)?;
                match format.as_str() {
                    "json" => format_files_json(&records),
                    _ => Ok(format_files_text(&records)),
                }
            }
            Commands::Tracks { file, format } => {
                let tracks = self.service.tracks(file)?;
                match format.as_str() {
                    "json" => format_tracks_json(&tracks),
                    _ => Ok(format_tracks_text(&tracks)),
                }
            }
            Commands::Extract {
                file,
                track_id,
                output,
            } => match output {
                Some(output) => {
                    let result = self.service.extract(file, *track_id, output)?;
                    Ok(format_extraction(&result))
                }
                None => {
                    let record = self.service.extract_track_version(file, *track_id)?;
                    Ok(format_track_version(&record))
                }
            },
            Commands::Watch { root } => self.handle_watch(root),
        }
    }

    fn handle_scan(&self, root: &Path, full: bool) -> Result<String, ApiError> {
        let report = self
            .runtime
            .block_on(self.service.reconcile_with(root, full, &mut LogProgress))?;
        Ok(format_reconcile_report(&report))
    }

    fn handle_watch(&self, root: &PathBuf) -> Result<String, ApiError> {
        let root = canonicalize_root(root).map_err(|_| ApiError::ProjectNotFound(root.clone()))?;

        let initial = self
            .runtime
            .block_on(self.service.reconcile_with(&root, false, &mut LogProgress))?;
        info!("{}", format_reconcile_report(&initial));

        let watcher = ProjectWatcher::new(root.clone(), self.config.watch.clone());
        watcher.run(|batch| {
            info!(events = batch.len(), "Change batch received");
            self.reconcile_after_change(&root);
            Ok(())
        })?;

        Ok(format!("Stopped watching {}", root.display()))
    }

    /// One watch-triggered pass. A failed pass is logged and watching goes on.
    fn reconcile_after_change(&self, root: &Path) -> Option<ReconcileReport> {
        match self
            .runtime
            .block_on(self.service.reconcile_with(root, false, &mut LogProgress))
        {
            Ok(report) => {
                info!("{}", format_reconcile_report(&report));
                Some(report)
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Reconcile after change failed");
                None
            }
        }
    }
}
