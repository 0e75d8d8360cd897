//! Raw TCP end-to-end tests.
//!
//! Each test binds a real server on ephemeral ports and talks to it over
//! plain sockets with newline-delimited JSON.

use hb_server::{BlackjackServer, ServerConfig};
use house_blackjack::{
    TableConfig, TableSnapshot,
    entities::{Phase, PlayerStatus},
    messages::{SHUTDOWN_TEXT, ServerMessage, TIMEOUT_TEXT},
};
use serde_json::json;
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

struct TestServer {
    tcp_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(table: TableConfig) -> Self {
        let config = ServerConfig {
            tcp_bind: "127.0.0.1:0".parse().unwrap(),
            ws_bind: "127.0.0.1:0".parse().unwrap(),
            table,
        };
        config.validate().unwrap();

        let server = BlackjackServer::bind(config).await.unwrap();
        let tcp_addr = server.tcp_addr();
        let (shutdown, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            tcp_addr,
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

fn fast_table() -> TableConfig {
    TableConfig {
        dealer_delay_ms: 0,
        ..TableConfig::default()
    }
}

struct TcpClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TcpClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        assert!(matches!(client.next().await, ServerMessage::NickRequest { .. }));
        client
    }

    async fn join(addr: SocketAddr, nickname: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send_line(nickname).await;
        client
    }

    async fn send_line(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send(&mut self, value: serde_json::Value) {
        self.send_line(&value.to_string()).await;
    }

    async fn next_line(&mut self) -> Option<String> {
        timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    async fn next(&mut self) -> ServerMessage {
        let line = self.next_line().await.expect("connection closed");
        ServerMessage::parse(&line).unwrap()
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

    async fn assert_closed(&mut self) {
        assert_eq!(self.next_line().await, None);
    }
}

#[tokio::test]
async fn test_round_over_tcp() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::join(server.tcp_addr, "alice").await;

    let snapshot = alice.state_where(|_| true).await;
    assert_eq!(snapshot.phase(), Phase::Betting);
    assert_eq!(snapshot.player("alice").unwrap().balance, 100);

    alice.send(json!({"type": "bet", "amount": 10})).await;
    let snapshot = alice.state_where(|s| s.phase() == Phase::Playing).await;
    assert_eq!(snapshot.game_state.current_player.as_deref(), Some("alice"));
    assert_eq!(snapshot.game_state.dealer_hand[0], "[hidden]");

    alice.send(json!({"type": "stand"})).await;
    let snapshot = alice.state_where(|s| s.phase() == Phase::Ended).await;
    let me = snapshot.player("alice").unwrap();
    assert_eq!(me.status, PlayerStatus::Stand);
    assert!(["Win!", "Push", "Lose"].contains(&me.result.as_str()));
    assert!(snapshot.game_state.dealer_value.unwrap() >= 17);

    server.stop().await;
}

#[tokio::test]
async fn test_json_nickname_line_is_accepted() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::connect(server.tcp_addr).await;
    alice.send(json!({"type": "nickname", "nickname": "alice"})).await;

    let snapshot = alice.state_where(|_| true).await;
    assert!(snapshot.player("alice").is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_duplicate_nickname_is_rejected_and_closed() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::join(server.tcp_addr, "alice").await;
    alice.state_where(|_| true).await;

    let mut imposter = TcpClient::join(server.tcp_addr, "alice").await;
    assert!(matches!(imposter.next().await, ServerMessage::Error { .. }));
    imposter.assert_closed().await;

    server.stop().await;
}

#[tokio::test]
async fn test_handshake_timeout() {
    let server = TestServer::start(TableConfig {
        handshake_timeout_secs: 1,
        ..fast_table()
    })
    .await;

    let mut silent = TcpClient::connect(server.tcp_addr).await;
    match silent.next().await {
        ServerMessage::Error { message } => assert_eq!(message, TIMEOUT_TEXT),
        other => panic!("expected error, got {other:?}"),
    }
    silent.assert_closed().await;

    server.stop().await;
}

#[tokio::test]
async fn test_blank_lines_before_nickname_are_skipped() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::connect(server.tcp_addr).await;
    alice.send_line("").await;
    alice.send_line("   ").await;
    alice.send_line("alice").await;

    let snapshot = alice.state_where(|_| true).await;
    assert!(snapshot.player("alice").is_some());

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_line_keeps_connection_open() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::join(server.tcp_addr, "alice").await;
    alice.state_where(|_| true).await;

    alice.send_line("this is not json").await;
    alice.send(json!({"type": "chat", "text": "still here"})).await;

    match alice.next().await {
        ServerMessage::Chat { from, text, .. } => {
            assert_eq!(from, "alice");
            assert_eq!(text, "still here");
        }
        other => panic!("expected chat, got {other:?}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_disconnect_broadcasts_player_left() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::join(server.tcp_addr, "alice").await;
    alice.state_where(|_| true).await;

    let mut bob = TcpClient::join(server.tcp_addr, "bob").await;
    bob.state_where(|_| true).await;
    match alice.next().await {
        ServerMessage::PlayerJoined { nickname, .. } => assert_eq!(nickname, "bob"),
        other => panic!("expected player_joined, got {other:?}"),
    }

    drop(bob);

    loop {
        match alice.next().await {
            ServerMessage::PlayerLeft { nickname, message } => {
                assert_eq!(nickname, "bob");
                assert_eq!(message, "bob left the game");
                break;
            }
            ServerMessage::State(_) => continue,
            other => panic!("expected player_left, got {other:?}"),
        }
    }
    let snapshot = alice.state_where(|_| true).await;
    assert_eq!(snapshot.stats.total_players, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_says_goodbye() {
    let server = TestServer::start(fast_table()).await;
    let mut alice = TcpClient::join(server.tcp_addr, "alice").await;
    alice.state_where(|_| true).await;

    server.stop().await;

    match alice.next().await {
        ServerMessage::ServerMessage { message } => assert_eq!(message, SHUTDOWN_TEXT),
        other => panic!("expected goodbye, got {other:?}"),
    }
    alice.assert_closed().await;
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let server = TestServer::start(fast_table()).await;
    let config = ServerConfig {
        tcp_bind: server.tcp_addr,
        ws_bind: "127.0.0.1:0".parse().unwrap(),
        table: fast_table(),
    };

    let err = BlackjackServer::bind(config).await.unwrap_err();
    assert!(err.to_string().contains(&server.tcp_addr.to_string()));

    server.stop().await;
}
