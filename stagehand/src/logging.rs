//! Development-time tracing for debugging the supervisor.
//!
//! Operator-facing output goes through the [`crate::io::ui::Ui`] trait;
//! tracing is dev diagnostics only, controlled by `RUST_LOG` and written to
//! stderr. Nothing here is part of the pipeline's product output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Output: stderr, compact format.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
