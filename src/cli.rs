//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; a single route table dispatches to the project service.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands};
pub use presentation::{
    format_extraction, format_files_json, format_files_text, format_reconcile_report,
    format_track_version, format_tracks_json, format_tracks_text, hierarchy,
};
pub use route::{load_config, RunContext};
