//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber. Logs
//! go to stderr so they never interleave with the status line on stdout.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently ignored.
///
/// Reads log level from RUST_LOG environment variable, defaulting to the
/// level specified in config.
///
/// # Examples
///
/// ```no_run
/// catchup::telemetry::init("warn");
/// tracing::warn!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directive(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}

fn filter_directive(level: &str) -> String {
    format!("catchup={},reqwest=warn", level)
}
