//! Container codec
//!
//! Live sets are gzip containers around a UTF-8 XML document. This module
//! knows the gzip framing and nothing about the document inside it.

pub mod crc32;
pub mod gzip;

pub use gzip::{compress, decompress};
