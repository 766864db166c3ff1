//! CLI presentation: text and json formatters per command.

use crate::error::ApiError;
use crate::extract::ExtractionResult;
use crate::live_set::TrackRecord;
use crate::project::ReconcileReport;
use crate::store::FileRecord;
use comfy_table::Table;
use serde_json::json;
use std::collections::HashMap;

fn to_json(value: &serde_json::Value) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::Output(e.to_string()))
}

/// Tracks in display order: depth-first, siblings by order key
pub fn hierarchy(tracks: &[TrackRecord]) -> Vec<(usize, &TrackRecord)> {
    let mut children: HashMap<Option<i64>, Vec<&TrackRecord>> = HashMap::new();
    for track in tracks {
        children.entry(track.parent_group_id).or_default().push(track);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.order_key.cmp(&b.order_key));
    }

    let mut ordered = Vec::with_capacity(tracks.len());
    let mut stack: Vec<(usize, &TrackRecord)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|t| (0, *t)).collect())
        .unwrap_or_default();
    while let Some((depth, track)) = stack.pop() {
        ordered.push((depth, track));
        if let Some(kids) = children.get(&Some(track.id)) {
            stack.extend(kids.iter().rev().map(|t| (depth + 1, *t)));
        }
    }
    ordered
}

pub fn format_tracks_text(tracks: &[TrackRecord]) -> String {
    if tracks.is_empty() {
        return "No tracks.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Id", "Name", "Kind", "Order", "Output", "Frozen"]);
    for (depth, track) in hierarchy(tracks) {
        let name = format!("{}{}", "  ".repeat(depth), track.name);
        let output = track
            .audio_output
            .as_ref()
            .or(track.midi_output.as_ref())
            .map(|r| r.display_name.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            track.id.to_string(),
            name,
            track.kind.label().to_string(),
            track.order_key.to_string(),
            output,
            if track.is_frozen { "yes" } else { "" }.to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_tracks_json(tracks: &[TrackRecord]) -> Result<String, ApiError> {
    let rows: Vec<serde_json::Value> = hierarchy(tracks)
        .into_iter()
        .map(|(depth, t)| {
            json!({
                "id": t.id,
                "name": t.name,
                "kind": t.kind.label(),
                "parent_group_id": t.parent_group_id,
                "order_key": t.order_key.as_str(),
                "depth": depth,
                "color": t.color,
                "is_frozen": t.is_frozen,
                "delay": { "value": t.delay.value, "is_sample_units": t.delay.is_sample_units },
                "audio_input": t.audio_input,
                "audio_output": t.audio_output,
                "midi_input": t.midi_input,
                "midi_output": t.midi_output,
                "subproject_link": t.subproject_link,
            })
        })
        .collect();
    to_json(&json!({ "tracks": rows }))
}

pub fn format_files_text(records: &[FileRecord]) -> String {
    if records.is_empty() {
        return "No Live sets recorded. Run `sordello scan <root>` first.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Path", "Category", "Parsed", "Format", "Derived From"]);
    for r in records {
        let path = r
            .path
            .strip_prefix(&r.project)
            .unwrap_or(&r.path)
            .display()
            .to_string();
        let parent = r
            .parent_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            path,
            r.category.label().to_string(),
            if r.is_parsed { "yes" } else { "no" }.to_string(),
            r.format_version_tag.clone().unwrap_or_else(|| "-".to_string()),
            parent,
        ]);
    }
    table.to_string()
}

pub fn format_files_json(records: &[FileRecord]) -> Result<String, ApiError> {
    let rows: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            json!({
                "path": r.path,
                "category": r.category.label(),
                "parent_path": r.parent_path,
                "source_name": r.source_name,
                "source_track_id": r.source_track_id,
                "source_track_name": r.source_track_name,
                "last_known_modification_time": r.last_known_modification_time,
                "is_parsed": r.is_parsed,
                "format_version": r.format_version_tag,
            })
        })
        .collect();
    to_json(&json!({ "files": rows }))
}

pub fn format_reconcile_report(report: &ReconcileReport) -> String {
    let mut s = format!(
        "Scanned {} ({:?}):\n  Discovered: {}\n  New: {}\n  Changed: {}\n  Deleted: {}\n  Parsed: {}\n  Skipped: {}",
        report.root.display(),
        report.mode,
        report.discovered,
        report.new,
        report.changed,
        report.deleted,
        report.schedule.parsed.len(),
        report.schedule.skipped.len(),
    );
    if !report.versions_created.is_empty() {
        s.push_str(&format!("\n  Versions created: {}", report.versions_created.len()));
    }
    if !report.schedule.failed.is_empty() {
        s.push_str(&format!("\n\nFailed ({}):", report.schedule.failed.len()));
        for (path, reason) in &report.schedule.failed {
            s.push_str(&format!("\n  - {}: {}", path.display(), reason));
        }
    }
    s
}

pub fn format_extraction(result: &ExtractionResult) -> String {
    format!(
        "Extracted {} '{}' ({} tracks, {} returns) to {}",
        result.target_kind.label(),
        result.target_name,
        result.tracks_extracted,
        result.returns_carried,
        result.output_path.display()
    )
}

pub fn format_track_version(record: &FileRecord) -> String {
    format!(
        "Extracted '{}' to {}",
        record.source_track_name.as_deref().unwrap_or("track"),
        record.path.display()
    )
}
