//! Track extraction
//!
//! Carves one track, or a group with every track nested under it at any
//! depth, out of a Live set into a standalone set. The target is re-rooted
//! and routed to the master output; all return tracks are carried over
//! unchanged because sends are meaningless without them.

use crate::atomic;
use crate::codec;
use crate::document::{self, Document, Node, NodeId};
use crate::error::{ExtractionError, ParseError};
use crate::live_set::{self as format, parser, TrackKind, ROOT_GROUP_ID};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome of a successful extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Target plus descendants plus carried return tracks
    pub tracks_extracted: usize,
    pub returns_carried: usize,
    pub target_kind: TrackKind,
    pub target_name: String,
    pub output_path: PathBuf,
}

/// Summary of an in-memory rewrite
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteSummary {
    pub kept_ids: Vec<i64>,
    pub return_ids: Vec<i64>,
    pub target_kind: TrackKind,
    pub target_name: String,
}

/// Extract a track from the set at `source` into `output`
pub fn extract_file(
    source: &Path,
    target_id: i64,
    output: &Path,
) -> Result<ExtractionResult, ExtractionError> {
    let container = parser::read_container(source).map_err(|e| match e {
        ParseError::NotFound(path) => {
            ExtractionError::ReadFailure(format!("{} does not exist", path.display()))
        }
        ParseError::Io(io) => ExtractionError::ReadFailure(io.to_string()),
        other => ExtractionError::Parse(other),
    })?;
    let doc = parser::read_document(&container).map_err(|e| match e {
        ParseError::Codec(codec) => ExtractionError::Codec(codec),
        other => ExtractionError::Parse(other),
    })?;
    extract(doc, target_id, output)
}

/// Rewrite `doc` around `target_id`, then compress and write it to `output`
pub fn extract(
    mut doc: Document,
    target_id: i64,
    output: &Path,
) -> Result<ExtractionResult, ExtractionError> {
    let summary = rewrite(&mut doc, target_id)?;

    let xml = document::to_bytes(&doc)
        .map_err(|e| ExtractionError::SerializationFailure(e.to_string()))?;
    let container = codec::compress(&xml)?;
    atomic::write_atomic(output, &container).map_err(|e| {
        ExtractionError::WriteFailure(format!("{}: {}", output.display(), e))
    })?;

    let result = ExtractionResult {
        tracks_extracted: summary.kept_ids.len() + summary.return_ids.len(),
        returns_carried: summary.return_ids.len(),
        target_kind: summary.target_kind,
        target_name: summary.target_name,
        output_path: output.to_path_buf(),
    };
    info!(
        target_id,
        tracks = result.tracks_extracted,
        output = %output.display(),
        "Extracted track"
    );
    Ok(result)
}

struct TrackElement {
    node: NodeId,
    kind: TrackKind,
    id: i64,
    parent: Option<i64>,
}

/// Rewrite the tracks container in place so only the target's closure and
/// the return tracks remain
pub fn rewrite(doc: &mut Document, target_id: i64) -> Result<RewriteSummary, ExtractionError> {
    let tracks_node =
        format::tracks_container(doc).ok_or(ExtractionError::TrackNotFound(target_id))?;

    let elements: Vec<TrackElement> = format::track_elements(doc, tracks_node)
        .into_iter()
        .filter_map(|(node, kind)| {
            let id = format::track_id(doc, node)?;
            let parent = crate::live_set::track::parent_from_raw(
                format::value_of(doc, node, format::TRACK_GROUP_ID)
                    .and_then(|v| v.trim().parse().ok()),
            );
            Some(TrackElement {
                node,
                kind,
                id,
                parent,
            })
        })
        .collect();

    let target = elements
        .iter()
        .find(|e| e.id == target_id)
        .ok_or(ExtractionError::TrackNotFound(target_id))?;
    let target_kind = target.kind;
    let target_node = target.node;

    let kept: Vec<&TrackElement> = if target_kind == TrackKind::Group {
        let closure = group_closure(&elements, target_id);
        debug!(target_id, groups = closure.len(), "Computed group closure");
        elements
            .iter()
            .filter(|e| e.kind != TrackKind::ReturnBus)
            .filter(|e| e.id == target_id || e.parent.map_or(false, |p| closure.contains(&p)))
            .collect()
    } else {
        vec![target]
    };
    let returns: Vec<&TrackElement> = elements
        .iter()
        .filter(|e| e.kind == TrackKind::ReturnBus && e.id != target_id)
        .collect();

    let kept_ids: Vec<i64> = kept.iter().map(|e| e.id).collect();
    let return_ids: Vec<i64> = returns.iter().map(|e| e.id).collect();
    let ordered: Vec<NodeId> = kept
        .iter()
        .chain(returns.iter())
        .map(|e| e.node)
        .collect();

    reroot(doc, target_node);
    let target_name = parser::parse_document(doc)
        .ok()
        .and_then(|r| r.find(target_id).map(|t| t.name.clone()))
        .unwrap_or_default();

    replace_tracks(doc, tracks_node, &ordered);

    Ok(RewriteSummary {
        kept_ids,
        return_ids,
        target_kind,
        target_name,
    })
}

/// Ids of `root_group` and every group nested under it at any depth
fn group_closure(elements: &[TrackElement], root_group: i64) -> HashSet<i64> {
    let groups: Vec<(i64, Option<i64>)> = elements
        .iter()
        .filter(|e| e.kind == TrackKind::Group)
        .map(|e| (e.id, e.parent))
        .collect();

    let mut retained = HashSet::from([root_group]);
    let mut frontier = vec![root_group];
    while let Some(current) = frontier.pop() {
        for (id, parent) in &groups {
            if *parent == Some(current) && retained.insert(*id) {
                frontier.push(*id);
            }
        }
    }
    retained
}

/// Move a track to root level and send its audio to the master output
fn reroot(doc: &mut Document, track: NodeId) {
    format::set_value(doc, track, format::TRACK_GROUP_ID, &ROOT_GROUP_ID.to_string());

    let chain = match doc.find_child(track, format::DEVICE_CHAIN) {
        Some(chain) => chain,
        None => {
            let chain = doc.create_element(format::DEVICE_CHAIN);
            doc.append_child(track, chain);
            chain
        }
    };
    let routing = match doc.find_child(chain, format::AUDIO_OUTPUT_ROUTING) {
        Some(routing) => routing,
        None => {
            let routing = doc.create_element(format::AUDIO_OUTPUT_ROUTING);
            doc.append_child(chain, routing);
            routing
        }
    };
    format::set_value(doc, routing, format::ROUTING_TARGET, format::MASTER_OUTPUT_TARGET);
    format::set_value(
        doc,
        routing,
        format::ROUTING_UPPER_DISPLAY,
        format::MASTER_OUTPUT_DISPLAY,
    );
    format::set_value(doc, routing, format::ROUTING_LOWER_DISPLAY, "");
}

/// Replace the container's children, keeping the source indentation
fn replace_tracks(doc: &mut Document, tracks_node: NodeId, ordered: &[NodeId]) {
    let old_children = doc.children(tracks_node).to_vec();
    let whitespace = |id: &NodeId| match doc.node(*id) {
        Node::Text(raw) if raw.trim().is_empty() => Some(raw.clone()),
        _ => None,
    };
    let indent = old_children.first().and_then(&whitespace);
    let trailer = if old_children.len() > 1 {
        old_children.last().and_then(&whitespace)
    } else {
        None
    };

    let mut children = Vec::with_capacity(ordered.len() * 2 + 1);
    for node in ordered {
        if let Some(indent) = &indent {
            children.push(doc.create_text(indent));
        }
        children.push(*node);
    }
    if let Some(trailer) = trailer {
        children.push(doc.create_text(&trailer));
    }
    doc.replace_children(tracks_node, children);
}
