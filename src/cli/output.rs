//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, ExtractionError, ParseError};

/// Map domain/service errors to a user-facing line.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Extraction(ExtractionError::TrackNotFound(id)) => {
            format!("No track with id {} in this set", id)
        }
        ApiError::Parse(ParseError::NotFound(path)) => {
            format!("File not found: {}", path.display())
        }
        ApiError::ProjectNotFound(path) => {
            format!("Project folder not found: {}", path.display())
        }
        other => other.to_string(),
    }
}

/// Process exit code for a failed command
pub fn exit_code(e: &ApiError) -> i32 {
    match e {
        ApiError::ConfigError(_) => 2,
        ApiError::ProjectNotFound(_) | ApiError::Parse(ParseError::NotFound(_)) => 3,
        _ => 1,
    }
}
