use std::{fmt, sync::Arc};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::errors::TransportError;

/// Outbound side of one client connection, as seen by the table.
///
/// Implementations must not block: the table calls them from its single
/// serialized loop.
pub trait Transport: Send + fmt::Debug {
    /// Queues one serialized message for delivery.
    fn send_frame(&self, frame: Arc<str>) -> Result<(), TransportError>;

    /// Asks the connection to close after flushing what was queued.
    fn close(&self);
}

/// Items consumed by a connection's writer task.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outbound {
    Frame(Arc<str>),
    Close,
}

/// [`Transport`] backed by a bounded channel drained by a writer task.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    sender: mpsc::Sender<Outbound>,
}

impl ChannelTransport {
    pub fn new(sender: mpsc::Sender<Outbound>) -> Self {
        Self { sender }
    }

    /// Creates a transport plus the receiver its writer task should drain.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self::new(sender), receiver)
    }
}

impl Transport for ChannelTransport {
    fn send_frame(&self, frame: Arc<str>) -> Result<(), TransportError> {
        self.sender
            .try_send(Outbound::Frame(frame))
            .map_err(|err| match err {
                TrySendError::Full(_) => TransportError::Backpressure,
                TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    fn close(&self) {
        // Dropping the transport also ends the writer once the queue drains.
        let _ = self.sender.try_send(Outbound::Close);
    }
}
