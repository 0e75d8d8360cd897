//! Structured logging configuration.
//!
//! The library crate logs through the `log` facade; `init` installs a
//! `tracing` subscriber whose log bridge picks those records up too.

use std::net::SocketAddr;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels come from `RUST_LOG` and default to `info`.
///
/// # Example
///
/// ```no_run
/// use hb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tungstenite=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a connection lifecycle event with structured data
///
/// # Arguments
///
/// * `kind` - Event kind (`accepted`, `closed`, `timeout`, ...)
/// * `peer` - Remote address, when the transport knows it
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use hb_server::logging::log_connection_event;
///
/// log_connection_event("accepted", Some("127.0.0.1:40000".parse().unwrap()), "tcp");
/// ```
pub fn log_connection_event(kind: &str, peer: Option<SocketAddr>, message: &str) {
    let peer = peer.map(|addr| addr.to_string());
    if kind == "timeout" || kind == "error" {
        tracing::warn!(event_type = kind, peer = peer.as_deref(), "CONNECTION: {}", message);
    } else {
        tracing::info!(event_type = kind, peer = peer.as_deref(), "CONNECTION: {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_connection_event() {
        // Just ensure it doesn't panic without a subscriber
        log_connection_event("accepted", Some("127.0.0.1:1".parse().unwrap()), "tcp");
        log_connection_event("timeout", None, "no nickname");
    }
}
