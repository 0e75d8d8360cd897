//! WebSocket transport.
//!
//! Each text frame carries one JSON [`ClientMessage`] and each server message
//! goes out as one text frame. Unlike raw TCP there is no plain-text
//! handshake: the client joins by sending `{"type":"nickname",...}` after it
//! receives the `nick_request`.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:5556/');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "nick_request") {
//!     ws.send(JSON.stringify({ type: "nickname", nickname: "alice" }));
//!   } else if (data.type === "state") {
//!     render(data);
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "bet", amount: 10 }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use house_blackjack::{
    TableHandle,
    entities::ConnectionId,
    messages::ClientMessage,
    net::transport::{ChannelTransport, Outbound},
};
use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::AppState;

/// Body returned to plain HTTP requests on the WebSocket port.
pub const FALLBACK_TEXT: &str = "Blackjack server is running. Connect with a blackjack client.";

/// Upgrade to a WebSocket, or answer a plain HTTP request with a banner.
pub async fn websocket_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            FALLBACK_TEXT,
        )
            .into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();

    let (transport, outbound) = ChannelTransport::channel(state.config.outbound_buffer);
    let connection = match state.table.connect(Box::new(transport)).await {
        Ok(connection) => connection,
        Err(err) => {
            warn!("WebSocket rejected, table unavailable: {err}");
            return;
        }
    };
    info!("WebSocket connected: {connection}");

    let mut send_task = tokio::spawn(send_frames(sender, outbound));

    tokio::select! {
        _ = &mut send_task => {
            debug!("{connection}: outbound side closed");
        }
        _ = receive_messages(receiver, connection, &state.table) => {
            send_task.abort();
        }
    }

    let _ = state.table.disconnect(connection).await;
    info!("WebSocket closed: {connection}");
}

async fn send_frames(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                    break;
                }
            }
            Outbound::Close => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

async fn receive_messages(
    mut receiver: SplitStream<WebSocket>,
    connection: ConnectionId,
    table: &TableHandle,
) {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match ClientMessage::parse(text.as_str()) {
                Ok(message) => {
                    if table.inbound(connection, message).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!("{connection}: dropping malformed message: {err}"),
            },
            Ok(Message::Close(_)) => break,
            Err(err) => {
                warn!("{connection}: WebSocket error: {err}");
                break;
            }
            _ => {}
        }
    }
}
