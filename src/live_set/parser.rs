//! Track parser
//!
//! Turns a Live set (raw container bytes, XML bytes or an already parsed
//! [`Document`]) into ordered [`TrackRecord`]s plus the version string.
//! Document order of the track elements is authoritative: the i-th track gets
//! the i-th key of [`order::generate_initial`].

use crate::codec;
use crate::document::{self, Document, NodeId};
use crate::error::ParseError;
use crate::live_set::track::{parent_from_raw, RoutingInfo, TrackDelay, TrackKind, TrackRecord};
use crate::live_set::{self as format, value_of};
use crate::order;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Non-fatal inconsistencies found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyWarning {
    /// A track names a parent that is not a group of this set; it is kept at root
    DanglingParent { track_id: i64, parent_id: i64 },
    /// The set has no `LiveSet/Tracks` element
    MissingTracksContainer,
    /// A track element without a usable `Id` was skipped
    MissingTrackId { tag: String },
}

/// Output of one parse
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub tracks: Vec<TrackRecord>,
    pub format_version: Option<String>,
    pub warnings: Vec<ConsistencyWarning>,
}

impl ParseResult {
    pub fn find(&self, id: i64) -> Option<&TrackRecord> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Root-level tracks in order-key order
    pub fn roots(&self) -> Vec<&TrackRecord> {
        self.sorted(|t| t.parent_group_id.is_none())
    }

    /// Direct children of a group in order-key order
    pub fn children_of(&self, group_id: i64) -> Vec<&TrackRecord> {
        self.sorted(|t| t.parent_group_id == Some(group_id))
    }

    fn sorted(&self, keep: impl Fn(&TrackRecord) -> bool) -> Vec<&TrackRecord> {
        let mut selected: Vec<&TrackRecord> = self.tracks.iter().filter(|t| keep(t)).collect();
        selected.sort_by(|a, b| a.order_key.cmp(&b.order_key));
        selected
    }
}

/// Stateless parser handle handed to parse workers
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveSetParser;

impl LiveSetParser {
    pub fn parse_file(&self, path: &Path) -> Result<ParseResult, ParseError> {
        parse_file(path)
    }
}

/// Read, decompress and parse a Live set on disk
pub fn parse_file(path: &Path) -> Result<ParseResult, ParseError> {
    let bytes = read_container(path)?;
    parse_container(&bytes)
}

/// Read the raw container bytes of a Live set, checking the extension first
pub fn read_container(path: &Path) -> Result<Vec<u8>, ParseError> {
    if !format::has_set_extension(path) {
        return Err(ParseError::InvalidContainer(format!(
            "{} does not have the .{} extension",
            path.display(),
            format::FILE_EXTENSION
        )));
    }
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ParseError::NotFound(path.to_path_buf()),
        _ => ParseError::Io(e),
    })
}

/// Decompress container bytes into a document with a verified root
pub fn read_document(container: &[u8]) -> Result<Document, ParseError> {
    if !codec::gzip::has_magic(container) {
        return Err(ParseError::InvalidContainer(
            "missing gzip magic number".to_string(),
        ));
    }
    let xml = codec::decompress(container)?;
    let doc = document::parse_bytes(&xml)?;
    verify_root(&doc)?;
    Ok(doc)
}

/// Parse gzip container bytes
pub fn parse_container(container: &[u8]) -> Result<ParseResult, ParseError> {
    let doc = read_document(container)?;
    parse_document(&doc)
}

/// Parse decompressed XML bytes
pub fn parse_xml(xml: &[u8]) -> Result<ParseResult, ParseError> {
    let doc = document::parse_bytes(xml)?;
    verify_root(&doc)?;
    parse_document(&doc)
}

fn verify_root(doc: &Document) -> Result<(), ParseError> {
    match doc.tag(doc.root()) {
        Some(format::ROOT_TAG) => Ok(()),
        other => Err(ParseError::UnrecognizedFormat(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Version string with the creator prefix removed
pub fn format_version(doc: &Document) -> Option<String> {
    let creator = doc.attribute(doc.root(), format::CREATOR_ATTRIBUTE)?;
    let version = creator.strip_prefix(format::CREATOR_PREFIX).unwrap_or(creator);
    Some(version.trim().to_string())
}

/// Extract track records from a parsed document
pub fn parse_document(doc: &Document) -> Result<ParseResult, ParseError> {
    verify_root(doc)?;
    let format_version = format_version(doc);
    let mut warnings = Vec::new();

    let Some(tracks_node) = format::tracks_container(doc) else {
        debug!("Live set has no tracks container");
        warnings.push(ConsistencyWarning::MissingTracksContainer);
        return Ok(ParseResult {
            tracks: Vec::new(),
            format_version,
            warnings,
        });
    };

    let mut drafts = Vec::new();
    for (node, kind) in format::track_elements(doc, tracks_node) {
        match format::track_id(doc, node) {
            Some(id) => drafts.push(read_track(doc, node, kind, id)),
            None => {
                let tag = kind.tag().to_string();
                warn!(tag = %tag, "Skipping track element without Id");
                warnings.push(ConsistencyWarning::MissingTrackId { tag });
            }
        }
    }

    let group_ids: HashSet<i64> = drafts
        .iter()
        .filter(|d| d.kind == TrackKind::Group)
        .map(|d| d.id)
        .collect();

    let keys = order::generate_initial(drafts.len());
    let tracks = drafts
        .into_iter()
        .zip(keys)
        .map(|(mut draft, order_key)| {
            if let Some(parent_id) = draft.parent_group_id {
                if !group_ids.contains(&parent_id) {
                    warn!(track_id = draft.id, parent_id, "Track references unknown group, keeping at root");
                    warnings.push(ConsistencyWarning::DanglingParent {
                        track_id: draft.id,
                        parent_id,
                    });
                    draft.parent_group_id = None;
                }
            }
            draft.into_record(order_key)
        })
        .collect();

    Ok(ParseResult {
        tracks,
        format_version,
        warnings,
    })
}

struct TrackDraft {
    id: i64,
    name: String,
    kind: TrackKind,
    parent_group_id: Option<i64>,
    color: i64,
    is_frozen: bool,
    delay: TrackDelay,
    audio_input: Option<RoutingInfo>,
    audio_output: Option<RoutingInfo>,
    midi_input: Option<RoutingInfo>,
    midi_output: Option<RoutingInfo>,
}

impl TrackDraft {
    fn into_record(self, order_key: order::OrderKey) -> TrackRecord {
        TrackRecord {
            id: self.id,
            name: self.name,
            kind: self.kind,
            parent_group_id: self.parent_group_id,
            order_key,
            color: self.color,
            is_frozen: self.is_frozen,
            delay: self.delay,
            audio_input: self.audio_input,
            audio_output: self.audio_output,
            midi_input: self.midi_input,
            midi_output: self.midi_output,
            subproject_link: None,
        }
    }
}

fn read_track(doc: &Document, node: NodeId, kind: TrackKind, id: i64) -> TrackDraft {
    let device_chain = doc.find_child(node, format::DEVICE_CHAIN);
    let routing = |tag: &str| device_chain.and_then(|chain| read_routing(doc, chain, tag));

    TrackDraft {
        id,
        name: read_name(doc, node),
        kind,
        parent_group_id: parent_from_raw(
            value_of(doc, node, format::TRACK_GROUP_ID).and_then(|v| v.trim().parse().ok()),
        ),
        color: value_of(doc, node, "Color")
            .or_else(|| value_of(doc, node, "ColorIndex"))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0),
        is_frozen: value_of(doc, node, "Freeze").map(parse_bool).unwrap_or(false),
        delay: read_delay(doc, node),
        audio_input: routing(format::AUDIO_INPUT_ROUTING),
        audio_output: routing(format::AUDIO_OUTPUT_ROUTING),
        midi_input: routing(format::MIDI_INPUT_ROUTING),
        midi_output: routing(format::MIDI_OUTPUT_ROUTING),
    }
}

fn read_name(doc: &Document, node: NodeId) -> String {
    let Some(name) = doc.find_child(node, "Name") else {
        return String::new();
    };
    value_of(doc, name, "EffectiveName")
        .filter(|v| !v.is_empty())
        .or_else(|| value_of(doc, name, "UserName"))
        .unwrap_or_default()
        .to_string()
}

fn read_delay(doc: &Document, node: NodeId) -> TrackDelay {
    let Some(delay) = doc.find_child(node, "TrackDelay") else {
        return TrackDelay::default();
    };
    TrackDelay {
        value: value_of(doc, delay, "Value")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0.0),
        is_sample_units: value_of(doc, delay, "IsValueSampleBased")
            .map(parse_bool)
            .unwrap_or(false),
    }
}

fn read_routing(doc: &Document, chain: NodeId, tag: &str) -> Option<RoutingInfo> {
    let routing = doc.find_child(chain, tag)?;
    let target = value_of(doc, routing, format::ROUTING_TARGET)?.to_string();
    if is_unrouted(&target) {
        return None;
    }
    Some(RoutingInfo {
        target,
        display_name: value_of(doc, routing, format::ROUTING_UPPER_DISPLAY)
            .unwrap_or_default()
            .to_string(),
        channel: value_of(doc, routing, format::ROUTING_LOWER_DISPLAY)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Empty targets and "none" targets (`None`, `AudioIn/None`, ...) carry no routing
pub fn is_unrouted(target: &str) -> bool {
    let target = target.trim();
    if target.is_empty() {
        return true;
    }
    let last = target.rsplit('/').next().unwrap_or(target);
    last.eq_ignore_ascii_case(format::NONE_TARGET)
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
