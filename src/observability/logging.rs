//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once, from the binary
//! - Pick the filter from `RUST_LOG`, falling back to the configured level
//! - Emit human-readable or JSON lines
//!
//! Library code only uses the `tracing` macros; nothing here runs unless the
//! embedding program asks for it.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber.
///
/// Fails if a subscriber was already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let json = config
        .json_logs
        .then(|| fmt::layer().json().with_current_span(true).with_target(true));
    let pretty = (!config.json_logs).then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
}

fn default_directives(level: &str) -> String {
    format!("{level},tower_http={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_http_spans() {
        assert_eq!(default_directives("debug"), "debug,tower_http=debug");
    }
}
