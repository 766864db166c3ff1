//! Merge rules: defaults first, later sources override earlier ones.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with every default registered.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    let store_path = crate::config::default_store_path();
    Config::builder()
        .set_default("storage.store_path", store_path.to_string_lossy().into_owned())?
        .set_default("reconcile.wave_size", 4)?
        .set_default("reconcile.mtime_tolerance_secs", 1.0)?
        .set_default("reconcile.auto_version_main", true)?
        .set_default("reconcile.follow_symlinks", false)?
        .set_default("watch.debounce_ms", 1000)?
        .set_default("watch.ignore_patterns", Vec::<String>::new())
}
