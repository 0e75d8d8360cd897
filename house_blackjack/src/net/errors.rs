//! Protocol and transport error types.

use std::io;
use thiserror::Error;

/// Problems with a single inbound frame. Apart from `Io`, the frame is
/// dropped and the connection stays open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Whether the connection can no longer be read from.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Outbound delivery failures.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TransportError {
    /// The peer is gone. Treated as a disconnect.
    #[error("connection closed")]
    Closed,

    /// The peer is not keeping up; the frame was dropped.
    #[error("outbound buffer full")]
    Backpressure,
}
