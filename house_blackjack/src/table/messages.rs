//! Table actor message types.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::{
    game::{entities::ConnectionId, views::TableSnapshot},
    net::{messages::ClientMessage, transport::Transport},
};

/// Messages handled by the [`TableActor`](super::TableActor), one at a time.
#[derive(Debug)]
pub enum TableMessage {
    /// A transport connected. The actor asks it for a nickname.
    Connect {
        connection: ConnectionId,
        transport: Box<dyn Transport>,
    },

    /// A parsed message from a connection.
    Inbound {
        connection: ConnectionId,
        message: ClientMessage,
    },

    /// The connection's read side ended or failed.
    Disconnect { connection: ConnectionId },

    /// Internal: a dealer pacing timer fired for `round`.
    DealerDraw { round: u64 },

    /// Current public state, without broadcasting it.
    Snapshot {
        response: oneshot::Sender<TableSnapshot>,
    },

    /// Notify every session, close all connections and stop.
    Shutdown { response: oneshot::Sender<()> },
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TableError {
    #[error("table is closed")]
    Closed,
}
