//! Table actor implementation with async message handling.

use std::{
    collections::HashMap,
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::{mpsc, oneshot};

use super::{
    config::TableConfig,
    messages::{TableError, TableMessage},
};
use crate::{
    game::{
        BlackjackGame, GameEvent, RuleViolation,
        entities::{ConnectionId, Phase},
        views::TableSnapshot,
    },
    net::{
        errors::TransportError,
        messages::{ClientMessage, ServerMessage, parse_amount},
        transport::Transport,
    },
};

const INBOX_CAPACITY: usize = 1024;

/// Cloneable handle for talking to a running [`TableActor`].
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    next_connection: Arc<AtomicU64>,
}

impl TableHandle {
    fn new(sender: mpsc::Sender<TableMessage>) -> Self {
        Self {
            sender,
            next_connection: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn send(&self, message: TableMessage) -> Result<(), TableError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| TableError::Closed)
    }

    /// Registers a new connection's outbound side and returns its id.
    pub async fn connect(&self, transport: Box<dyn Transport>) -> Result<ConnectionId, TableError> {
        let connection = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        self.send(TableMessage::Connect {
            connection,
            transport,
        })
        .await?;
        Ok(connection)
    }

    pub async fn inbound(
        &self,
        connection: ConnectionId,
        message: ClientMessage,
    ) -> Result<(), TableError> {
        self.send(TableMessage::Inbound {
            connection,
            message,
        })
        .await
    }

    pub async fn disconnect(&self, connection: ConnectionId) -> Result<(), TableError> {
        self.send(TableMessage::Disconnect { connection }).await
    }

    pub async fn snapshot(&self) -> Result<TableSnapshot, TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::Snapshot { response }).await?;
        rx.await.map_err(|_| TableError::Closed)
    }

    /// Notifies every session, closes their connections and waits for the
    /// actor to stop.
    pub async fn shutdown(&self) -> Result<(), TableError> {
        let (response, rx) = oneshot::channel();
        self.send(TableMessage::Shutdown { response }).await?;
        rx.await.map_err(|_| TableError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Single writer for the game and the only holder of outbound transports.
pub struct TableActor {
    config: TableConfig,

    game: BlackjackGame,

    inbox: mpsc::Receiver<TableMessage>,

    /// Used by dealer pacing timers. Weak so timers never keep the table alive.
    loopback: mpsc::WeakSender<TableMessage>,

    connections: HashMap<ConnectionId, Box<dyn Transport>>,

    /// Round whose dealer timer is in flight, if any
    dealer_timer: Option<u64>,

    /// Connections whose transport reported `Closed` during a broadcast
    dead: Vec<ConnectionId>,
}

impl TableActor {
    pub fn new(config: TableConfig) -> (Self, TableHandle) {
        let game = BlackjackGame::new(config.game.clone());
        Self::with_game(config, game)
    }

    /// Runs the table on an existing game, e.g. one with a stacked deck.
    pub fn with_game(config: TableConfig, game: BlackjackGame) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let actor = Self {
            config,
            game,
            inbox,
            loopback: sender.downgrade(),
            connections: HashMap::new(),
            dealer_timer: None,
            dead: Vec::new(),
        };
        (actor, TableHandle::new(sender))
    }

    /// Processes messages until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        log::info!(
            "table open (max bet {}, start balance {}, min players {})",
            self.config.game.max_bet,
            self.config.game.start_balance,
            self.config.game.min_players
        );

        while let Some(message) = self.inbox.recv().await {
            if self.handle_message(message).is_break() {
                break;
            }
        }

        log::info!("table closed");
    }

    fn handle_message(&mut self, message: TableMessage) -> ControlFlow<()> {
        match message {
            TableMessage::Connect {
                connection,
                transport,
            } => self.handle_connect(connection, transport),

            TableMessage::Inbound {
                connection,
                message,
            } => self.handle_inbound(connection, message),

            TableMessage::Disconnect { connection } => {
                if let Some(transport) = self.connections.remove(&connection) {
                    transport.close();
                }
                if let Some(nickname) = self.game.leave(connection) {
                    log::info!("{nickname} disconnected ({connection})");
                    self.publish();
                } else {
                    log::debug!("{connection} disconnected before joining");
                }
            }

            TableMessage::DealerDraw { round } => {
                if self.dealer_timer != Some(round) {
                    log::debug!("ignoring stale dealer timer for round {round}");
                    return ControlFlow::Continue(());
                }
                self.dealer_timer = None;
                match self.game.dealer_draw() {
                    Ok(_) => self.publish(),
                    Err(err) => {
                        log::debug!("dealer timer for round {round} found nothing to do: {err}");
                        self.publish();
                    }
                }
            }

            TableMessage::Snapshot { response } => {
                let _ = response.send(self.game.snapshot());
            }

            TableMessage::Shutdown { response } => {
                self.shutdown();
                let _ = response.send(());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn handle_connect(&mut self, connection: ConnectionId, transport: Box<dyn Transport>) {
        if self.connections.contains_key(&connection) {
            log::warn!("{connection} connected twice, keeping the first transport");
            return;
        }
        match deliver(&*transport, &ServerMessage::nick_request()) {
            Ok(()) => {
                log::debug!("{connection} connected, awaiting nickname");
                self.connections.insert(connection, transport);
            }
            Err(err) => log::warn!("{connection} lost before nickname request: {err}"),
        }
    }

    fn handle_inbound(&mut self, connection: ConnectionId, message: ClientMessage) {
        let label = message.to_string();
        let result = match message {
            ClientMessage::Nickname { nickname } => {
                self.handle_nickname(connection, &nickname);
                return;
            }
            ClientMessage::Chat { text } => {
                self.handle_chat(connection, &text);
                return;
            }
            ClientMessage::Bet { amount } => match parse_amount(&amount) {
                Some(amount) => self.game.place_bet(connection, amount),
                None => {
                    log::debug!("{connection}: unreadable bet amount {amount}");
                    return;
                }
            },
            ClientMessage::Hit => self.game.hit(connection).map(|_| ()),
            ClientMessage::Stand => self.game.stand(connection),
            ClientMessage::NewRound => self.game.new_round(connection),
        };

        match result {
            Ok(()) => self.publish(),
            Err(violation) => self.ignore(connection, &label, &violation),
        }
    }

    fn ignore(&self, connection: ConnectionId, label: &str, violation: &RuleViolation) {
        log::debug!("{connection}: ignoring {label}: {violation}");
    }

    fn handle_nickname(&mut self, connection: ConnectionId, raw: &str) {
        if !self.connections.contains_key(&connection) {
            log::debug!("{connection}: nickname from unknown connection");
            return;
        }
        if let Some(nickname) = self.game.nickname_of(connection) {
            log::debug!("{connection}: already joined as {nickname}, ignoring nickname");
            return;
        }

        match self.game.join(connection, raw) {
            Ok(nickname) => {
                log::info!("{connection} joined as {nickname}");
                self.publish();
            }
            Err(err) => {
                log::info!("{connection}: nickname {raw:?} rejected: {err}");
                if let Some(transport) = self.connections.remove(&connection) {
                    let _ = deliver(&*transport, &ServerMessage::error(err.to_string()));
                    transport.close();
                }
            }
        }
    }

    fn handle_chat(&mut self, connection: ConnectionId, text: &str) {
        let Some(from) = self.game.nickname_of(connection).map(ToString::to_string) else {
            log::debug!("{connection}: chat before joining");
            return;
        };
        let length = text.chars().count();
        if length == 0 || length > self.config.max_chat_len {
            log::debug!("{connection}: dropping chat of {length} chars");
            return;
        }

        let message = ServerMessage::Chat {
            from,
            text: text.to_string(),
            ts: chrono::Utc::now().timestamp(),
        };
        self.broadcast(&message, None);
        if self.reap_dead() {
            self.publish();
        }
    }

    /// Broadcasts pending events and the new state, then lets the dealer
    /// and connection cleanup react until nothing changes synchronously.
    fn publish(&mut self) {
        loop {
            for event in self.game.drain_events() {
                log::debug!("event: {event}");
                let exclude = match &event {
                    GameEvent::PlayerJoined(nickname) => self.game.connection_of(nickname.as_str()),
                    _ => None,
                };
                if let Some(message) = ServerMessage::from_event(&event) {
                    self.broadcast(&message, exclude);
                }
            }

            let snapshot = ServerMessage::State(self.game.snapshot());
            self.broadcast(&snapshot, None);

            let reaped = self.reap_dead();
            let dealer_acted = self.drive_dealer();
            if !reaped && !dealer_acted {
                break;
            }
        }
    }

    /// Moves the dealer forward. Returns whether the game changed now;
    /// paced draws happen later through a timer.
    fn drive_dealer(&mut self) -> bool {
        if self.game.phase() != Phase::DealerTurn {
            return false;
        }

        if !self.game.dealer_needs_card() {
            return match self.game.settle() {
                Ok(()) => true,
                Err(err) => {
                    log::error!("settlement refused: {err}");
                    false
                }
            };
        }

        if self.config.dealer_delay_ms == 0 {
            return self.game.dealer_draw().is_ok();
        }

        if self.dealer_timer.is_none() {
            self.schedule_dealer_draw();
        }
        false
    }

    fn schedule_dealer_draw(&mut self) {
        let round = self.game.round_number();
        let delay = self.config.dealer_delay();
        let loopback = self.loopback.clone();
        self.dealer_timer = Some(round);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = loopback.upgrade() {
                let _ = sender.send(TableMessage::DealerDraw { round }).await;
            }
        });
    }

    /// Sends `message` to every joined session except `exclude`.
    fn broadcast(&mut self, message: &ServerMessage, exclude: Option<ConnectionId>) {
        let frame: Arc<str> = match message.to_frame() {
            Ok(frame) => frame.into(),
            Err(err) => {
                log::error!("failed to serialize broadcast: {err}");
                return;
            }
        };

        for (connection, transport) in &self.connections {
            if Some(*connection) == exclude || self.game.nickname_of(*connection).is_none() {
                continue;
            }
            match transport.send_frame(frame.clone()) {
                Ok(()) => {}
                Err(TransportError::Backpressure) => {
                    log::warn!("{connection}: outbound buffer full, dropping frame");
                }
                Err(TransportError::Closed) => {
                    log::warn!("{connection}: transport closed, removing session");
                    self.dead.push(*connection);
                }
            }
        }
    }

    /// Removes sessions whose transport died. Returns whether any session
    /// was removed.
    fn reap_dead(&mut self) -> bool {
        let mut removed = false;
        for connection in std::mem::take(&mut self.dead) {
            self.connections.remove(&connection);
            if self.game.leave(connection).is_some() {
                removed = true;
            }
        }
        removed
    }

    fn shutdown(&mut self) {
        log::info!(
            "shutting down, notifying {} connection(s)",
            self.connections.len()
        );
        let message = ServerMessage::shutdown();
        for (connection, transport) in self.connections.drain() {
            if let Err(err) = deliver(&*transport, &message) {
                log::debug!("{connection}: shutdown notice not delivered: {err}");
            }
            transport.close();
        }
    }
}

fn deliver(transport: &dyn Transport, message: &ServerMessage) -> Result<(), TransportError> {
    match message.to_frame() {
        Ok(frame) => transport.send_frame(frame.into()),
        Err(err) => {
            log::error!("failed to serialize message: {err}");
            Ok(())
        }
    }
}
