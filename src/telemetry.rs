//! Tracing initialization.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: standard EnvFilter directives (default: `mcpflow=info`)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Initialize the tracing subscriber.
///
/// Safe to call once per process; later calls return an error from the
/// global registry which callers may ignore in tests.
pub fn init_telemetry() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mcpflow=info"));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(filter),
        )
        .try_init();
}
