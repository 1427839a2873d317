//! Development-time tracing for debugging the agent.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Never mixed into the agent's answer.
//!
//! - **`--verbose` output (the `agent` binary)**: Step, tool-call and token
//!   usage lines on stdout, driven by loop events. Unaffected by `RUST_LOG`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber.
///
/// Reads `RUST_LOG`; unparsable directives are skipped and the default is
/// `warn`, so timeouts, kills and model failures show up without any setup.
///
/// # Example
/// ```bash
/// RUST_LOG=agent=debug agent --working-dir ./calculator "what does main.py do?"
/// ```
pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
