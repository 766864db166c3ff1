//! Config loader facade: composes defaults and sources, returns SordelloConfig.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::SordelloConfig;
use config::{ConfigError, File};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a project root
    ///
    /// Precedence (lowest to highest): defaults, global file, project file,
    /// environment.
    pub fn load(workspace_root: &Path) -> Result<SordelloConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Load a single explicit file over the defaults; environment still applies
    pub fn load_from_file(path: &Path) -> Result<SordelloConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Defaults only, no files or environment
    pub fn defaults() -> Result<SordelloConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .build()?
            .try_deserialize()
    }
}
