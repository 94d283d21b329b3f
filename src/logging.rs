//! Structured logging setup using `tracing-subscriber`.
//!
//! One-shot CLI process: human-readable output to stderr, level
//! controlled by the `RUST_LOG` environment variable (default: `info`).

use tracing_subscriber::EnvFilter;

/// Initialise logging for the `gg-push` binary.
///
/// Emits human-readable output to stderr only. Controlled by `RUST_LOG`
/// (default: `info`).
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
