//! Raw TCP transport: newline-delimited JSON.
//!
//! The first non-empty line a client sends is its nickname, as plain text.
//! A client that sends nothing within the handshake timeout receives
//! `error{"Connection timed out"}` and is closed. Every later line is one
//! [`ClientMessage`].

use house_blackjack::{
    TableConfig, TableHandle,
    entities::ConnectionId,
    messages::{ClientMessage, ServerMessage, TIMEOUT_TEXT},
    net::{
        errors::ProtocolError,
        transport::{ChannelTransport, Outbound, Transport},
    },
    utils::{MAX_LINE_LEN, read_line, write_line},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufRead, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream, tcp::OwnedWriteHalf},
    sync::mpsc,
    time::{Instant, timeout, timeout_at},
};
use tracing::{debug, warn};

use crate::logging::log_connection_event;

/// How long a finished reader waits for queued frames to reach the socket.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the read side of a connection stopped.
#[derive(Debug)]
enum ReadEnd {
    Eof,
    HandshakeTimeout,
    TableClosed,
    Failed(ProtocolError),
}

/// Accept connections forever, one task per client.
pub async fn serve(listener: TcpListener, table: TableHandle, config: TableConfig) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let table = table.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer, table, config).await;
                });
            }
            Err(err) => warn!("Failed to accept TCP connection: {err}"),
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, table: TableHandle, config: TableConfig) {
    log_connection_event("accepted", Some(peer), "tcp");
    if let Err(err) = stream.set_nodelay(true) {
        debug!("{peer}: could not set TCP_NODELAY: {err}");
    }

    let (reader, writer) = stream.into_split();
    let (transport, outbound) = ChannelTransport::channel(config.outbound_buffer);
    let local = transport.clone();
    let connection = match table.connect(Box::new(transport)).await {
        Ok(connection) => connection,
        Err(err) => {
            warn!("{peer}: table unavailable: {err}");
            return;
        }
    };

    let mut writer_task = tokio::spawn(write_frames(writer, outbound));
    let mut reader = BufReader::new(reader);

    let (end, writer_done) = tokio::select! {
        _ = &mut writer_task => (None, true),
        end = read_frames(&mut reader, connection, peer, &table, &local, config.handshake_timeout()) => {
            (Some(end), false)
        }
    };

    match &end {
        Some(ReadEnd::Failed(err)) => log_connection_event("error", Some(peer), &err.to_string()),
        Some(ReadEnd::HandshakeTimeout) => {
            log_connection_event("timeout", Some(peer), "no nickname received")
        }
        _ => {}
    }

    if !matches!(end, Some(ReadEnd::TableClosed)) {
        let _ = table.disconnect(connection).await;
    }
    drop(local);

    if !writer_done && timeout(FLUSH_TIMEOUT, &mut writer_task).await.is_err() {
        writer_task.abort();
    }
    log_connection_event("closed", Some(peer), &format!("tcp {connection}"));
}

async fn read_frames<R>(
    reader: &mut R,
    connection: ConnectionId,
    peer: SocketAddr,
    table: &TableHandle,
    local: &ChannelTransport,
    handshake_timeout: Duration,
) -> ReadEnd
where
    R: AsyncBufRead + Unpin,
{
    let deadline = Instant::now() + handshake_timeout;
    let mut introduced = false;

    loop {
        let line = if introduced {
            read_line(reader, MAX_LINE_LEN).await
        } else {
            match timeout_at(deadline, read_line(reader, MAX_LINE_LEN)).await {
                Ok(line) => line,
                Err(_) => {
                    send_local(local, &ServerMessage::error(TIMEOUT_TEXT));
                    local.close();
                    return ReadEnd::HandshakeTimeout;
                }
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return ReadEnd::Eof,
            Err(err) if err.is_fatal() => return ReadEnd::Failed(err),
            Err(err) => {
                warn!("{peer}: dropping inbound line: {err}");
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message = if introduced {
            match ClientMessage::parse(line) {
                Ok(message) => message,
                Err(err) => {
                    warn!("{peer}: dropping malformed message: {err}");
                    continue;
                }
            }
        } else {
            introduced = true;
            introduction(line)
        };

        if table.inbound(connection, message).await.is_err() {
            return ReadEnd::TableClosed;
        }
    }
}

/// The nickname line is plain text, but a client that already speaks JSON
/// may send a `nickname` message instead.
fn introduction(line: &str) -> ClientMessage {
    match ClientMessage::parse(line) {
        Ok(message @ ClientMessage::Nickname { .. }) => message,
        _ => ClientMessage::Nickname {
            nickname: line.to_string(),
        },
    }
}

fn send_local(local: &ChannelTransport, message: &ServerMessage) {
    match message.to_frame() {
        Ok(frame) => {
            let _ = local.send_frame(Arc::from(frame));
        }
        Err(err) => warn!("Failed to serialize {message:?}: {err}"),
    }
}

async fn write_frames(mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Outbound>) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(err) = write_line(&mut writer, &frame).await {
                    debug!("TCP write failed: {err}");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}
