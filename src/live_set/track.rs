//! Track records extracted from a Live set

use crate::order::OrderKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sentinel parent id Live writes for root-level tracks
pub const ROOT_GROUP_ID: i64 = -1;

/// Track kinds found under `LiveSet/Tracks`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Audio,
    Midi,
    Group,
    ReturnBus,
}

impl TrackKind {
    /// Map an element tag to a track kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "AudioTrack" => Some(TrackKind::Audio),
            "MidiTrack" => Some(TrackKind::Midi),
            "GroupTrack" => Some(TrackKind::Group),
            "ReturnTrack" => Some(TrackKind::ReturnBus),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            TrackKind::Audio => "AudioTrack",
            TrackKind::Midi => "MidiTrack",
            TrackKind::Group => "GroupTrack",
            TrackKind::ReturnBus => "ReturnTrack",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrackKind::Audio => "audio",
            TrackKind::Midi => "midi",
            TrackKind::Group => "group",
            TrackKind::ReturnBus => "return",
        }
    }
}

/// One routing descriptor (`Target` plus its two display strings)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub target: String,
    pub display_name: String,
    pub channel: String,
}

/// Track delay; `is_sample_units` selects samples over milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackDelay {
    pub value: f64,
    pub is_sample_units: bool,
}

/// One track or group of a Live set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: i64,
    pub name: String,
    pub kind: TrackKind,
    /// `None` means the track sits at root level
    pub parent_group_id: Option<i64>,
    pub order_key: OrderKey,
    pub color: i64,
    pub is_frozen: bool,
    pub delay: TrackDelay,
    pub audio_input: Option<RoutingInfo>,
    pub audio_output: Option<RoutingInfo>,
    pub midi_input: Option<RoutingInfo>,
    pub midi_output: Option<RoutingInfo>,
    /// Set once a group has been extracted into its own set
    pub subproject_link: Option<PathBuf>,
}

impl TrackRecord {
    pub fn is_group(&self) -> bool {
        self.kind == TrackKind::Group
    }

    pub fn is_root(&self) -> bool {
        self.parent_group_id.is_none()
    }
}

/// Normalize Live's parent id encoding (`-1` or absent means root)
pub fn parent_from_raw(raw: Option<i64>) -> Option<i64> {
    match raw {
        Some(id) if id != ROOT_GROUP_ID => Some(id),
        _ => None,
    }
}
