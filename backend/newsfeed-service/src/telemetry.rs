//! Structured logging setup for the process hosting the services.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a JSON `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_directive`. Calling this more than once is a
/// no-op, so tests and embedding processes can call it freely.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive.into());

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .try_init();

    if result.is_ok() {
        tracing::info!("Tracing initialized for newsfeed-service");
    }
}
