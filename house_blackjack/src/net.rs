//! Wire protocol and transport plumbing.
//!
//! Messages are JSON objects tagged by a `type` field. Stream transports
//! frame them one per line.

/// Protocol and transport error types.
pub mod errors;

/// Inbound and outbound message types.
pub mod messages;

/// Transport-agnostic outbound delivery.
pub mod transport;

/// Newline-delimited framing helpers.
pub mod utils;
