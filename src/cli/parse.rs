//! CLI parse: clap types for Sordello. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Sordello CLI - version tracking for Ableton Live projects
#[derive(Parser)]
#[command(name = "sordello")]
#[command(about = "Track, version, and extract tracks from Ableton Live sets")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Reconcile a project folder with the record store
    Scan {
        /// Project root
        root: PathBuf,
        /// Rebuild every record instead of applying changes
        #[arg(long)]
        full: bool,
    },
    /// List the Live sets recorded for a project
    Files {
        /// Project root
        root: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the track hierarchy of one Live set
    Tracks {
        /// Live set file
        file: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Extract a track (with its group members) into a standalone set
    Extract {
        /// Source Live set
        file: PathBuf,
        /// Track id to extract
        track_id: i64,
        /// Output file; defaults to the project's track history
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Watch a project folder and reconcile on every change
    Watch {
        /// Project root
        root: PathBuf,
    },
}

impl Commands {
    /// Folder whose project config applies to this command
    pub fn project_root(&self) -> PathBuf {
        match self {
            Commands::Scan { root, .. } | Commands::Files { root, .. } | Commands::Watch { root } => {
                root.clone()
            }
            Commands::Tracks { file, .. } | Commands::Extract { file, .. } => file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Scan { .. } => "scan",
            Commands::Files { .. } => "files",
            Commands::Tracks { .. } => "tracks",
            Commands::Extract { .. } => "extract",
            Commands::Watch { .. } => "watch",
        }
    }
}
