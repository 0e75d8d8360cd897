//! WebSocket integration tests.
//!
//! Real WebSocket clients go through `tokio-tungstenite`; the plain HTTP
//! routes are exercised in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures_util::{SinkExt, StreamExt};
use hb_server::{
    BlackjackServer, ServerConfig,
    api::{AppState, create_router, websocket::FALLBACK_TEXT},
};
use house_blackjack::{
    TableConfig, TableHandle, TableSnapshot,
    entities::Phase,
    messages::ServerMessage,
};
use http_body_util::BodyExt;
use serde_json::json;
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tower::ServiceExt;

struct TestServer {
    tcp_addr: SocketAddr,
    ws_addr: SocketAddr,
    table: TableHandle,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let config = ServerConfig {
            tcp_bind: "127.0.0.1:0".parse().unwrap(),
            ws_bind: "127.0.0.1:0".parse().unwrap(),
            table: TableConfig {
                dealer_delay_ms: 0,
                ..TableConfig::default()
            },
        };

        let server = BlackjackServer::bind(config).await.unwrap();
        let tcp_addr = server.tcp_addr();
        let ws_addr = server.ws_addr();
        let table = server.table();
        let (shutdown, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            tcp_addr,
            ws_addr,
            table,
            shutdown: Some(shutdown),
            task,
        }
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        timeout(Duration::from_secs(5), &mut self.task)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    async fn connect(addr: SocketAddr) -> Self {
        let (stream, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
        let mut client = Self { stream };
        assert!(matches!(client.next().await, ServerMessage::NickRequest { .. }));
        client
    }

    async fn join(addr: SocketAddr, nickname: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client
            .send(json!({"type": "nickname", "nickname": nickname}))
            .await;
        client
    }

    async fn send(&mut self, value: serde_json::Value) {
        self.stream
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    /// Next text frame, or `None` once the server closes the socket.
    async fn next_text(&mut self) -> Option<String> {
        loop {
            let msg = timeout(Duration::from_secs(10), self.stream.next())
                .await
                .expect("timed out waiting for a frame");
            match msg {
                Some(Ok(Message::Text(text))) => return Some(text.as_str().to_string()),
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn next(&mut self) -> ServerMessage {
        let text = self.next_text().await.expect("socket closed");
        ServerMessage::parse(&text).unwrap()
    }

    async fn state_where(&mut self, predicate: impl Fn(&TableSnapshot) -> bool) -> TableSnapshot {
        loop {
            if let ServerMessage::State(snapshot) = self.next().await {
                if predicate(&snapshot) {
                    return snapshot;
                }
            }
        }
    }
}

#[tokio::test]
async fn test_websocket_join_and_bet() {
    let server = TestServer::start().await;
    let mut alice = WsClient::join(server.ws_addr, "alice").await;

    let snapshot = alice.state_where(|_| true).await;
    assert_eq!(snapshot.phase(), Phase::Betting);

    alice.send(json!({"type": "bet", "amount": "25"})).await;
    let snapshot = alice.state_where(|s| s.phase() == Phase::Playing).await;
    assert_eq!(snapshot.player("alice").unwrap().bet, 25);

    server.stop().await;
}

#[tokio::test]
async fn test_websocket_duplicate_nickname_is_closed() {
    let server = TestServer::start().await;
    let mut alice = WsClient::join(server.ws_addr, "alice").await;
    alice.state_where(|_| true).await;

    let mut imposter = WsClient::join(server.ws_addr, "alice").await;
    assert!(matches!(imposter.next().await, ServerMessage::Error { .. }));
    assert_eq!(imposter.next_text().await, None);

    server.stop().await;
}

#[tokio::test]
async fn test_tcp_and_websocket_share_one_table() {
    let server = TestServer::start().await;

    let stream = TcpStream::connect(server.tcp_addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let first = lines.next_line().await.unwrap().unwrap();
    assert!(matches!(
        ServerMessage::parse(&first).unwrap(),
        ServerMessage::NickRequest { .. }
    ));
    writer.write_all(b"alice\n").await.unwrap();
    let joined = lines.next_line().await.unwrap().unwrap();
    assert!(matches!(
        ServerMessage::parse(&joined).unwrap(),
        ServerMessage::State(_)
    ));

    let mut bob = WsClient::join(server.ws_addr, "bob").await;
    let snapshot = bob.state_where(|_| true).await;
    assert_eq!(snapshot.stats.total_players, 2);
    assert!(snapshot.player("alice").is_some());

    let announced = timeout(Duration::from_secs(10), lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match ServerMessage::parse(&announced).unwrap() {
        ServerMessage::PlayerJoined { nickname, message } => {
            assert_eq!(nickname, "bob");
            assert_eq!(message, "bob joined the game");
        }
        other => panic!("expected player_joined, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_plain_http_gets_banner() {
    let server = TestServer::start().await;
    let app = create_router(AppState::new(server.table.clone(), TableConfig::default()));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], FALLBACK_TEXT.as_bytes());

    server.stop().await;
}

#[tokio::test]
async fn test_health_counts_sessions() {
    let server = TestServer::start().await;
    let mut alice = WsClient::join(server.ws_addr, "alice").await;
    alice.state_where(|_| true).await;

    let app = create_router(AppState::new(server.table.clone(), TableConfig::default()));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["phase"], "betting");
    assert_eq!(json["players"], 1);

    server.stop().await;
}
