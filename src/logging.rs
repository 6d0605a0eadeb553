//! Logging related thingies

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Builds the level filter, preferring `RUST_LOG` over the configured level
pub fn build_loglevel_filter_layer(default_level: &str) -> EnvFilter {
    let directives =
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_ascii_lowercase());
    EnvFilter::new(directives)
}

/// Wires up a fmt subscriber for the whole process. Embedders that bring
/// their own subscriber should skip this and filter the `goatm2m` target
/// themselves.
pub fn init_logging(default_level: &str) -> Result<(), String> {
    tracing_subscriber::registry()
        .with(build_loglevel_filter_layer(default_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| err.to_string())
}
