//! Structural document model
//!
//! A minimal labelled tree over the decompressed Live set XML: enough to read
//! attributes, move track elements around and write the result back while
//! leaving every untouched byte as it was.

pub mod node;
pub mod reader;
pub mod writer;

pub use node::{Attribute, Document, Element, Node, NodeId};
pub use reader::{parse_bytes, parse_str};
pub use writer::to_bytes;
