//! Sordello: version tracking for Ableton Live projects
//!
//! Reads Live's gzip-compressed XML sets, keeps a record of every set under a
//! project folder (main sets, Live's own backups, and the versions and track
//! extractions Sordello writes to `.sordello/`), and extracts single tracks or
//! whole groups into standalone sets.

pub mod access;
pub mod atomic;
pub mod cli;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod live_set;
pub mod logging;
pub mod order;
pub mod paths;
pub mod project;
pub mod service;
pub mod store;
pub mod watch;
