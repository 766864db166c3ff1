//! Shared test utilities for integration tests
//!
//! Builds real Live set containers (gzip-compressed XML) on disk.

use sordello::access::TrackedAccess;
use sordello::config::SordelloConfig;
use sordello::live_set::LiveSetParser;
use sordello::project::ProjectReconciler;
use sordello::service::ProjectService;
use sordello::store::{ProjectStore, SledProjectStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One track element of a fixture set
#[derive(Debug, Clone)]
pub struct TrackFixture {
    pub tag: &'static str,
    pub id: i64,
    pub name: String,
    pub group: i64,
}

pub fn audio(id: i64, name: &str, group: i64) -> TrackFixture {
    TrackFixture {
        tag: "AudioTrack",
        id,
        name: name.to_string(),
        group,
    }
}

pub fn midi(id: i64, name: &str, group: i64) -> TrackFixture {
    TrackFixture {
        tag: "MidiTrack",
        id,
        name: name.to_string(),
        group,
    }
}

pub fn group(id: i64, name: &str, parent: i64) -> TrackFixture {
    TrackFixture {
        tag: "GroupTrack",
        id,
        name: name.to_string(),
        group: parent,
    }
}

pub fn ret(id: i64, name: &str) -> TrackFixture {
    TrackFixture {
        tag: "ReturnTrack",
        id,
        name: name.to_string(),
        group: -1,
    }
}

/// Drums group (10) holding Kick (11), Snare (12) and a nested Perc group
/// (13) with Shaker (14); Bass (20) at root; Reverb return (30)
pub fn sample_tracks() -> Vec<TrackFixture> {
    vec![
        group(10, "Drums", -1),
        audio(11, "Kick", 10),
        audio(12, "Snare", 10),
        group(13, "Perc", 10),
        audio(14, "Shaker", 13),
        midi(20, "Bass", -1),
        ret(30, "Reverb"),
    ]
}

pub fn set_xml(tracks: &[TrackFixture]) -> String {
    let mut body = String::new();
    for t in tracks {
        let output = if t.group == -1 {
            r#"<Target Value="AudioOut/Master" /><UpperDisplayString Value="Master" /><LowerDisplayString Value="" />"#.to_string()
        } else {
            format!(
                r#"<Target Value="AudioOut/GroupTrack" /><UpperDisplayString Value="Group {}" /><LowerDisplayString Value="" />"#,
                t.group
            )
        };
        body.push_str(&format!(
            "\n\t\t\t<{tag} Id=\"{id}\">\n\t\t\t\t<Name>\n\t\t\t\t\t<EffectiveName Value=\"{name}\" />\n\t\t\t\t\t<UserName Value=\"\" />\n\t\t\t\t</Name>\n\t\t\t\t<Color Value=\"{color}\" />\n\t\t\t\t<TrackGroupId Value=\"{group}\" />\n\t\t\t\t<DeviceChain>\n\t\t\t\t\t<AudioOutputRouting>{output}</AudioOutputRouting>\n\t\t\t\t</DeviceChain>\n\t\t\t</{tag}>",
            tag = t.tag,
            id = t.id,
            name = t.name,
            color = t.id % 70,
            group = t.group,
            output = output,
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Ableton MajorVersion=\"5\" MinorVersion=\"11.0_433\" Creator=\"Ableton Live 11.3.4\">\n\t<LiveSet>\n\t\t<Tracks>{}\n\t\t</Tracks>\n\t\t<MasterTrack />\n\t</LiveSet>\n</Ableton>\n",
        body
    )
}

/// Write a compressed set, creating parent folders
pub fn write_set(path: &Path, tracks: &[TrackFixture]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let container = sordello::codec::compress(set_xml(tracks).as_bytes()).unwrap();
    fs::write(path, container).unwrap();
}

/// Push a file's mtime forward so the next scan sees it as changed
pub fn bump_mtime(path: &Path, seconds: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    let current = file.metadata().unwrap().modified().unwrap();
    file.set_modified(current + Duration::from_secs(seconds)).unwrap();
}

/// Canonical project root inside a temp dir
pub fn project_root(temp: &tempfile::TempDir, name: &str) -> PathBuf {
    let root = temp.path().join(name);
    fs::create_dir_all(&root).unwrap();
    sordello::paths::canonicalize_root(&root).unwrap()
}

pub struct Harness {
    pub store: Arc<SledProjectStore>,
    pub access: Arc<TrackedAccess>,
    pub config: SordelloConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SordelloConfig::default())
    }

    pub fn with_config(config: SordelloConfig) -> Self {
        Self {
            store: Arc::new(SledProjectStore::temporary().unwrap()),
            access: TrackedAccess::new(),
            config,
        }
    }

    pub fn store(&self) -> Arc<dyn ProjectStore> {
        self.store.clone()
    }

    pub fn reconciler(&self) -> ProjectReconciler {
        ProjectReconciler::new(
            self.store(),
            self.access.clone(),
            Arc::new(LiveSetParser),
            self.config.reconcile.clone(),
        )
    }

    pub fn service(&self) -> ProjectService {
        ProjectService::new(
            self.store(),
            self.access.clone(),
            Arc::new(LiveSetParser),
            &self.config,
        )
    }
}
