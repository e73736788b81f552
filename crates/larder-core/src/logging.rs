//! Tracing initialization for the larder binary.
//!
//! Diagnostics go through `tracing` and land on stdout; the audit trail
//! (`crate::audit`) is a separate plain-CSV contract on stderr and does not
//! pass through the subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber. The level comes from `RUST_LOG` and
/// defaults to `info`. Call once at startup, before `Server::serve`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
