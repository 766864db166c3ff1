//! Live set format
//!
//! Constants and small accessors for the parts of the Ableton Live set
//! schema this crate reads and rewrites. Live stores most scalar settings as
//! `<Setting Value="..." />` children, which is what [`value_of`] reads.

pub mod parser;
pub mod track;

pub use parser::{ConsistencyWarning, LiveSetParser, ParseResult};
pub use track::{RoutingInfo, TrackDelay, TrackKind, TrackRecord, ROOT_GROUP_ID};

use crate::document::{Document, NodeId};

/// File extension of Live sets
pub const FILE_EXTENSION: &str = "als";

/// Root tag of every Live set document
pub const ROOT_TAG: &str = "Ableton";

/// Root attribute carrying the human-readable version
pub const CREATOR_ATTRIBUTE: &str = "Creator";

/// Literal prefix stripped from the creator string
pub const CREATOR_PREFIX: &str = "Ableton Live ";

/// Path from the root to the tracks container
pub const TRACKS_PATH: [&str; 2] = ["LiveSet", "Tracks"];

/// Routing target of the master output
pub const MASTER_OUTPUT_TARGET: &str = "AudioOut/Master";

/// Display string Live shows for the master output
pub const MASTER_OUTPUT_DISPLAY: &str = "Master";

/// Target value meaning "not routed"
pub const NONE_TARGET: &str = "none";

pub const DEVICE_CHAIN: &str = "DeviceChain";
pub const AUDIO_INPUT_ROUTING: &str = "AudioInputRouting";
pub const AUDIO_OUTPUT_ROUTING: &str = "AudioOutputRouting";
pub const MIDI_INPUT_ROUTING: &str = "MidiInputRouting";
pub const MIDI_OUTPUT_ROUTING: &str = "MidiOutputRouting";
pub const ROUTING_TARGET: &str = "Target";
pub const ROUTING_UPPER_DISPLAY: &str = "UpperDisplayString";
pub const ROUTING_LOWER_DISPLAY: &str = "LowerDisplayString";
pub const TRACK_GROUP_ID: &str = "TrackGroupId";
pub const VALUE_ATTRIBUTE: &str = "Value";

/// True when `path` has the Live set extension (case-insensitive)
pub fn has_set_extension(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(FILE_EXTENSION))
        .unwrap_or(false)
}

/// Locate `Ableton/LiveSet/Tracks`
pub fn tracks_container(doc: &Document) -> Option<NodeId> {
    doc.find_path(doc.root(), &TRACKS_PATH)
}

/// Track elements of the tracks container, in document order
pub fn track_elements(doc: &Document, tracks: NodeId) -> Vec<(NodeId, TrackKind)> {
    doc.child_elements(tracks)
        .filter_map(|child| {
            doc.tag(child)
                .and_then(TrackKind::from_tag)
                .map(|kind| (child, kind))
        })
        .collect()
}

/// `Id` attribute of a track element
pub fn track_id(doc: &Document, track: NodeId) -> Option<i64> {
    doc.attribute(track, "Id")?.trim().parse().ok()
}

/// `Value` attribute of the `tag` child of `node`
pub fn value_of<'a>(doc: &'a Document, node: NodeId, tag: &str) -> Option<&'a str> {
    let child = doc.find_child(node, tag)?;
    doc.attribute(child, VALUE_ATTRIBUTE)
}

/// Set the `Value` attribute of the `tag` child of `node`, creating the child if needed
pub fn set_value(doc: &mut Document, node: NodeId, tag: &str, value: &str) {
    let child = match doc.find_child(node, tag) {
        Some(child) => child,
        None => {
            let child = doc.create_element(tag);
            doc.append_child(node, child);
            child
        }
    };
    doc.set_attribute(child, VALUE_ATTRIBUTE, value);
}
