//! Watch Mode
//!
//! Watches a project root and delivers debounced batches of changes. Every
//! event pushes the delivery deadline out by the debounce window, so a batch
//! is only handed over once the folder has been quiet for that long.

use crate::config::WatchConfig;
use crate::error::ApiError;
use crate::live_set::has_set_extension;
use crate::project::HISTORY_DIR;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How often the loop wakes to check for a stop request
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// Filesystem change event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub is_directory: bool,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind, is_directory: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            is_directory,
        }
    }
}

/// Timer-reset accumulator
///
/// Events for the same path coalesce: the latest kind wins, except that a
/// modification right after a creation still reports a creation.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: BTreeMap<PathBuf, ChangeEvent>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: BTreeMap::new(),
            deadline: None,
        }
    }

    pub fn push(&mut self, event: ChangeEvent, now: Instant) {
        let merged = match self.pending.get(&event.path) {
            Some(previous)
                if previous.kind == ChangeKind::Created && event.kind == ChangeKind::Modified =>
            {
                ChangeEvent {
                    kind: ChangeKind::Created,
                    ..event
                }
            }
            _ => event,
        };
        self.pending.insert(merged.path.clone(), merged);
        self.deadline = Some(now + self.window);
    }

    /// The pending batch, once the quiet period has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<Vec<ChangeEvent>> {
        match self.deadline {
            Some(deadline) if now >= deadline && !self.pending.is_empty() => {
                self.deadline = None;
                Some(std::mem::take(&mut self.pending).into_values().collect())
            }
            _ => None,
        }
    }

    /// Time left before the pending batch is due
    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Decides which paths under a root are worth reporting
#[derive(Debug, Clone)]
pub struct EventFilter {
    root: PathBuf,
    ignore_patterns: Vec<String>,
}

impl EventFilter {
    pub fn new(root: PathBuf, ignore_patterns: Vec<String>) -> Self {
        Self {
            root,
            ignore_patterns,
        }
    }

    /// Hidden paths are dropped, except the version-history subtree.
    /// Only Live sets and directories (including vanished ones) pass.
    pub fn accepts(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        let hidden = relative.components().any(|c| match c {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                part.starts_with('.') && part != HISTORY_DIR
            }
            _ => false,
        });
        if hidden {
            return false;
        }
        if !has_set_extension(path) && path.extension().is_some() {
            return false;
        }
        let relative = relative.to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| matches_pattern(&relative, pattern))
    }
}

/// Simple glob matching: `**` spans directories, `*` is a single wildcard,
/// anything else matches as a substring
fn matches_pattern(path: &str, pattern: &str) -> bool {
    let path = path.replace('\\', "/");
    let pattern = pattern.replace('\\', "/");

    if let Some((prefix, suffix)) = pattern.split_once("**") {
        return path.starts_with(prefix) && path.contains(suffix.trim_start_matches('/'));
    }
    if let Some((prefix, suffix)) = pattern.split_once('*') {
        return path.starts_with(prefix) && path.ends_with(suffix);
    }
    path == pattern || path.contains(&pattern)
}

/// Convert a notify event into change events, one per path
pub fn convert_event(event: &Event) -> Vec<ChangeEvent> {
    let is_dir = |path: &Path, hint: Option<bool>| hint.unwrap_or_else(|| path.is_dir());
    match &event.kind {
        EventKind::Create(kind) => {
            let hint = match kind {
                CreateKind::Folder => Some(true),
                CreateKind::File => Some(false),
                _ => None,
            };
            event
                .paths
                .iter()
                .map(|p| ChangeEvent::new(p.clone(), ChangeKind::Created, is_dir(p, hint)))
                .collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| ChangeEvent::new(p.clone(), ChangeKind::Renamed, is_dir(p, None)))
            .collect(),
        EventKind::Modify(_) => event
            .paths
            .iter()
            .map(|p| ChangeEvent::new(p.clone(), ChangeKind::Modified, is_dir(p, None)))
            .collect(),
        EventKind::Remove(kind) => {
            let directory = matches!(kind, RemoveKind::Folder);
            event
                .paths
                .iter()
                .map(|p| ChangeEvent::new(p.clone(), ChangeKind::Deleted, directory))
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Long-running watcher over one project root
pub struct ProjectWatcher {
    root: PathBuf,
    config: WatchConfig,
    running: Arc<RwLock<bool>>,
}

impl ProjectWatcher {
    pub fn new(root: PathBuf, config: WatchConfig) -> Self {
        Self {
            root,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Shared flag; set it to `false` to make [`ProjectWatcher::run`] return
    pub fn running_flag(&self) -> Arc<RwLock<bool>> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        *self.running.write() = false;
    }

    /// Block, delivering each debounced batch to `on_batch` until stopped
    pub fn run<F>(&self, mut on_batch: F) -> Result<(), ApiError>
    where
        F: FnMut(Vec<ChangeEvent>) -> Result<(), ApiError>,
    {
        *self.running.write() = true;

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(root = %self.root.display(), "Watching project");

        let filter = EventFilter::new(self.root.clone(), self.config.ignore_patterns.clone());
        let mut debouncer = Debouncer::new(Duration::from_millis(self.config.debounce_ms));

        while *self.running.read() {
            let timeout = debouncer
                .time_remaining(Instant::now())
                .map(|left| left.min(STOP_POLL_INTERVAL))
                .unwrap_or(STOP_POLL_INTERVAL);

            match rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    let now = Instant::now();
                    for change in convert_event(&event) {
                        if filter.accepts(&change.path) {
                            debouncer.push(change, now);
                        }
                    }
                }
                Ok(Err(e)) => warn!("Watch error: {}", e),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
            }

            if let Some(batch) = debouncer.poll(Instant::now()) {
                debug!(events = batch.len(), "Delivering change batch");
                on_batch(batch)?;
            }
        }

        info!(root = %self.root.display(), "Stopped watching project");
        Ok(())
    }
}
