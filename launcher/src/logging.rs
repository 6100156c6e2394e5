//! Development-time tracing for debugging the launcher.
//!
//! Tracing goes to stderr next to relayed child stderr, so records are kept short:
//! no timestamps, no targets. The credential value is never a field.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the stderr subscriber. A subscriber that is already installed stays.
///
/// ```bash
/// RUST_LOG=launcher=debug launcher --timeout-secs 30
/// ```
pub fn init() {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(env_filter())
        .with(layer)
        .try_init()
        .ok();
}
