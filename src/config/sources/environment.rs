//! Environment source: SORDELLO__SECTION__KEY, e.g. SORDELLO__RECONCILE__WAVE_SIZE=8

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const ENV_PREFIX: &str = "SORDELLO";
pub const ENV_SEPARATOR: &str = "__";

pub fn source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("watch.ignore_patterns")
}

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(source())
}
