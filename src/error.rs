//! Error types for the Sordello project tracking system.

use std::path::PathBuf;
use thiserror::Error;

/// Gzip container errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid gzip header: {0}")]
    InvalidHeader(String),

    #[error("Gzip stream is truncated")]
    Truncated,

    #[error("Deflate decode failed: {0}")]
    DecodeFailed(String),

    #[error("Deflate encode failed: {0}")]
    EncodeFailed(String),

    #[error("Refusing to compress empty input")]
    EmptyInput,
}

/// Structural document errors
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Document is not valid UTF-8: {0}")]
    Encoding(String),
}

/// Live set parse errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("File not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Not a Live set container: {0}")]
    InvalidContainer(String),

    #[error("Container codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unrecognized format: root tag {0:?}")]
    UnrecognizedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DocumentError> for ParseError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Malformed(msg) => ParseError::MalformedDocument(msg),
            DocumentError::Encoding(msg) => ParseError::Encoding(msg),
        }
    }
}

/// Order key errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderKeyError {
    #[error("Order keys out of order: {before:?} is not below {after:?}")]
    InvalidOrder { before: String, after: String },

    #[error("No key fits strictly between {before:?} and {after:?}")]
    NoRoom { before: String, after: String },

    #[error("Invalid order key symbol in {0:?}")]
    InvalidSymbol(String),
}

/// Track extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Track not found: {0}")]
    TrackNotFound(i64),

    #[error("Failed to read source: {0}")]
    ReadFailure(String),

    #[error("Container codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Source parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to serialize document: {0}")]
    SerializationFailure(String),

    #[error("Failed to write output: {0}")]
    WriteFailure(String),
}

/// Persistent store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File record not found: {0:?}")]
    RecordNotFound(PathBuf),

    #[error("Record serialization failed: {0}")]
    Serialization(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Sandboxed access errors
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Access denied: {0:?}")]
    Denied(PathBuf),

    #[error("Access to {0:?} was never granted")]
    NotBegun(PathBuf),
}

/// Top-level errors surfaced by the service facade and CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Order key error: {0}")]
    OrderKey(#[from] OrderKeyError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Project root not found: {0:?}")]
    ProjectNotFound(PathBuf),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<notify::Error> for ApiError {
    fn from(err: notify::Error) -> Self {
        ApiError::Watch(err.to_string())
    }
}
