//! Blackjack round state machine.
//!
//! [`BlackjackGame`] owns the session registry and the round state. Every
//! mutation goes through one of its methods, so whoever owns the value is the
//! single writer. It is synchronous and transport-agnostic; the table actor
//! turns its events and snapshots into wire messages.
//!
//! Phases cycle `waiting -> betting -> playing -> dealer_turn -> ended ->
//! betting -> ...`.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{collections::{BTreeMap, VecDeque}, fmt};
use thiserror::Error;

use super::{
    constants::{
        BLACKJACK, DEALER_STANDS_ON, DEFAULT_MAX_BET, DEFAULT_MIN_PLAYERS, DEFAULT_START_BALANCE,
        HIDDEN_CARD,
    },
    entities::{Card, ConnectionId, Deck, Nickname, Outcome, Phase, Player, PlayerStatus},
    functional::{hand_value, is_bust},
    registry::{JoinError, SessionRegistry},
    views::{GameStateView, PlayerListEntry, PlayerView, RulesView, StatsView, TableSnapshot},
};

/// Rule violations. These never reach the client; the next snapshot shows
/// the unchanged state instead.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RuleViolation {
    #[error("connection has no session")]
    NotRegistered,
    #[error("only allowed during {expected}, table is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("not your turn")]
    OutOfTurn,
    #[error("invalid bet amount {amount}")]
    InvalidBet { amount: i64 },
    #[error("bet {amount} exceeds balance {balance}")]
    BetExceedsBalance { amount: i64, balance: i64 },
    #[error("bet {amount} exceeds max bet {max_bet}")]
    BetExceedsMax { amount: i64, max_bet: i64 },
    #[error("dealer already stands")]
    DealerDone,
    #[error("dealer must keep drawing")]
    DealerStillDrawing,
}

/// Things other sessions are told about besides the snapshot itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GameEvent {
    PlayerJoined(Nickname),
    PlayerLeft(Nickname),
    RoundStarted(u64),
    RoundAborted(String),
    RoundSettled(u64),
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerJoined(nickname) => write!(f, "{nickname} joined the game"),
            Self::PlayerLeft(nickname) => write!(f, "{nickname} left the game"),
            Self::RoundStarted(round) => write!(f, "round {round} started"),
            Self::RoundAborted(reason) => write!(f, "{reason}"),
            Self::RoundSettled(round) => write!(f, "round {round} settled"),
        }
    }
}

/// Table rules, fixed for the lifetime of the process.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSettings {
    pub max_bet: i64,
    pub start_balance: i64,
    pub min_players: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_bet: DEFAULT_MAX_BET,
            start_balance: DEFAULT_START_BALANCE,
            min_players: DEFAULT_MIN_PLAYERS,
        }
    }
}

/// Produces the deck used for each new round.
pub type DeckFactory = Box<dyn FnMut() -> Deck + Send>;

const ABORT_REASON: &str = "Not enough players left. The round was ended.";

#[derive(Debug, Default)]
struct RoundState {
    phase: Phase,
    current_player: Option<Nickname>,
    dealer_hand: Vec<Card>,
    deck: Deck,
    round: u64,
    notice: Option<String>,
}

/// Decides a settled hand against the dealer's final value.
///
/// A busted hand always loses, whatever the dealer holds.
pub fn settle_outcome(status: PlayerStatus, player_value: u32, dealer_value: u32) -> Outcome {
    if status == PlayerStatus::Bust || player_value > BLACKJACK {
        Outcome::Bust
    } else if dealer_value > BLACKJACK || player_value > dealer_value {
        Outcome::Win
    } else if player_value == dealer_value {
        Outcome::Push
    } else {
        Outcome::Lose
    }
}

/// Balance change applied at settlement time.
///
/// Busted hands were charged when they busted, so they are not charged again.
pub fn settlement_delta(outcome: Outcome, bet: i64) -> i64 {
    match outcome {
        Outcome::Win => 2 * bet,
        Outcome::Push => bet,
        Outcome::Lose => -bet,
        Outcome::Bust => 0,
    }
}

pub struct BlackjackGame {
    settings: GameSettings,
    registry: SessionRegistry,
    round: RoundState,
    deck_factory: DeckFactory,
    events: VecDeque<GameEvent>,
}

impl fmt::Debug for BlackjackGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlackjackGame")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("round", &self.round)
            .finish_non_exhaustive()
    }
}

impl Default for BlackjackGame {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

impl BlackjackGame {
    #[must_use]
    pub fn new(settings: GameSettings) -> Self {
        Self::with_deck_factory(settings, Box::new(Deck::shuffled))
    }

    /// Uses `deck_factory` instead of a fresh shuffle at the start of every
    /// round.
    #[must_use]
    pub fn with_deck_factory(settings: GameSettings, deck_factory: DeckFactory) -> Self {
        Self {
            registry: SessionRegistry::new(settings.start_balance),
            settings,
            round: RoundState::default(),
            deck_factory,
            events: VecDeque::new(),
        }
    }

    // --- Session registry ---

    /// Registers a session under a sanitized nickname. Opens betting once
    /// enough sessions are connected.
    pub fn join(&mut self, connection: ConnectionId, raw_nickname: &str) -> Result<Nickname, JoinError> {
        let nickname = self.registry.register(connection, raw_nickname)?.nickname.clone();
        info!("{nickname} joined ({connection})");
        self.events.push_back(GameEvent::PlayerJoined(nickname.clone()));
        self.try_enter_betting();
        Ok(nickname)
    }

    /// Removes the session bound to `connection`.
    ///
    /// A departing turn holder is treated as a forced stand. A round that no
    /// longer has enough active players is aborted without settlement.
    pub fn leave(&mut self, connection: ConnectionId) -> Option<Nickname> {
        let (seat, player) = self.registry.remove(connection)?;
        let nickname = player.nickname;
        info!("{nickname} left ({connection})");
        self.events.push_back(GameEvent::PlayerLeft(nickname.clone()));

        match self.round.phase {
            Phase::Playing => {
                if self.round.current_player.as_ref() == Some(&nickname) {
                    // The next seat slid into `seat`.
                    self.advance_turn_from(seat);
                }
                if self.round.phase == Phase::Playing && player.status.is_active() {
                    let active = self.registry.iter().filter(|p| p.status.is_active()).count();
                    if active < self.settings.min_players {
                        self.abort_round(ABORT_REASON);
                    }
                }
            }
            Phase::Betting => {
                if self.registry.len() < self.settings.min_players {
                    info!("betting closed, waiting for players");
                    self.round.phase = Phase::Waiting;
                } else {
                    self.try_start_round();
                }
            }
            Phase::Ended => self.reopen_betting_if_ready(),
            Phase::Waiting | Phase::DealerTurn => {}
        }

        if self.registry.is_empty() && matches!(self.round.phase, Phase::Betting | Phase::Ended) {
            debug!("table empty, resetting to waiting");
            self.reset_to_waiting();
        }

        Some(nickname)
    }

    // --- Player commands ---

    /// Commits a bet. Accepted only while betting, for a positive amount no
    /// larger than the balance or the max bet.
    pub fn place_bet(&mut self, connection: ConnectionId, amount: i64) -> Result<(), RuleViolation> {
        self.require_registered(connection)?;
        self.require_phase(Phase::Betting)?;

        let max_bet = self.settings.max_bet;
        let player = self
            .registry
            .by_connection_mut(connection)
            .ok_or(RuleViolation::NotRegistered)?;

        if amount <= 0 {
            return Err(RuleViolation::InvalidBet { amount });
        }
        if amount > player.balance {
            return Err(RuleViolation::BetExceedsBalance {
                amount,
                balance: player.balance,
            });
        }
        if amount > max_bet {
            return Err(RuleViolation::BetExceedsMax { amount, max_bet });
        }

        player.bet = amount;
        player.status = PlayerStatus::Ready;
        debug!("{} bets {amount}", player.nickname);

        self.try_start_round();
        Ok(())
    }

    /// Draws one card for the turn holder. Busting charges the bet right
    /// away and passes the turn.
    pub fn hit(&mut self, connection: ConnectionId) -> Result<Card, RuleViolation> {
        let seat = self.require_turn(connection)?;
        let card = self.round.deck.draw();

        let player = self
            .registry
            .by_connection_mut(connection)
            .ok_or(RuleViolation::NotRegistered)?;
        player.hand.push(card);
        debug!("{} hits: {card}", player.nickname);

        if is_bust(&player.hand) {
            player.status = PlayerStatus::Bust;
            player.result = Some(Outcome::Bust);
            player.balance -= player.bet;
            info!(
                "{} busts with {} and loses {}",
                player.nickname,
                hand_value(&player.hand),
                player.bet
            );
            self.advance_turn_from(seat + 1);
        }

        Ok(card)
    }

    /// Ends the turn holder's turn.
    pub fn stand(&mut self, connection: ConnectionId) -> Result<(), RuleViolation> {
        let seat = self.require_turn(connection)?;
        if let Some(player) = self.registry.by_connection_mut(connection) {
            player.status = PlayerStatus::Stand;
            debug!("{} stands on {}", player.nickname, hand_value(&player.hand));
        }
        self.advance_turn_from(seat + 1);
        Ok(())
    }

    /// Clears the caller's hand after a round. Betting reopens once every
    /// session has done so.
    pub fn new_round(&mut self, connection: ConnectionId) -> Result<(), RuleViolation> {
        self.require_registered(connection)?;
        self.require_phase(Phase::Ended)?;

        if let Some(player) = self.registry.by_connection_mut(connection) {
            player.reset_for_next_round();
        }

        self.reopen_betting_if_ready();
        Ok(())
    }

    // --- Dealer ---

    pub fn dealer_needs_card(&self) -> bool {
        self.round.phase == Phase::DealerTurn
            && hand_value(&self.round.dealer_hand) < DEALER_STANDS_ON
    }

    /// Draws a single dealer card. The caller paces consecutive draws.
    pub fn dealer_draw(&mut self) -> Result<Card, RuleViolation> {
        self.require_phase(Phase::DealerTurn)?;
        if !self.dealer_needs_card() {
            return Err(RuleViolation::DealerDone);
        }
        let card = self.round.deck.draw();
        self.round.dealer_hand.push(card);
        debug!(
            "dealer draws {card}, now at {}",
            hand_value(&self.round.dealer_hand)
        );
        Ok(card)
    }

    /// Pays out every standing or busted hand and ends the round.
    pub fn settle(&mut self) -> Result<(), RuleViolation> {
        self.require_phase(Phase::DealerTurn)?;
        if self.dealer_needs_card() {
            return Err(RuleViolation::DealerStillDrawing);
        }

        let dealer_value = hand_value(&self.round.dealer_hand);
        for player in self
            .registry
            .iter_mut()
            .filter(|p| p.status.awaits_settlement())
        {
            let outcome = settle_outcome(player.status, hand_value(&player.hand), dealer_value);
            player.balance += settlement_delta(outcome, player.bet);
            player.result = Some(outcome);
            info!(
                "{}: {outcome} (bet {}, balance {})",
                player.nickname, player.bet, player.balance
            );
        }

        self.round.phase = Phase::Ended;
        self.events
            .push_back(GameEvent::RoundSettled(self.round.round));
        info!("round {} ended, dealer has {dealer_value}", self.round.round);

        if self.registry.is_empty() {
            debug!("nobody left at the table, resetting to waiting");
            self.reset_to_waiting();
        }
        Ok(())
    }

    /// Runs the dealer to completion without pacing and settles.
    pub fn play_out_dealer(&mut self) -> Result<(), RuleViolation> {
        while self.dealer_needs_card() {
            self.dealer_draw()?;
        }
        self.settle()
    }

    // --- Views ---

    pub fn snapshot(&self) -> TableSnapshot {
        let now = chrono::Utc::now();

        let mut players = BTreeMap::new();
        let mut player_list = Vec::with_capacity(self.registry.len());
        for player in self.registry.iter() {
            let view = self.player_view(player);
            players.insert(player.nickname.to_string(), view.clone());
            player_list.push(PlayerListEntry {
                nickname: player.nickname.to_string(),
                view,
            });
        }

        player_list.sort_by(|a, b| a.nickname.cmp(&b.nickname));

        let revealed = self.round.phase.reveals_dealer();
        let dealer_hand = if !revealed && !self.round.dealer_hand.is_empty() {
            std::iter::once(HIDDEN_CARD.to_string())
                .chain(self.round.dealer_hand[1..].iter().map(Card::to_string))
                .collect()
        } else {
            self.round.dealer_hand.iter().map(Card::to_string).collect()
        };
        let dealer_value = revealed.then(|| hand_value(&self.round.dealer_hand));

        TableSnapshot {
            timestamp: now.timestamp_millis(),
            server_time: now.to_rfc3339(),
            rules: RulesView {
                max_bet: self.settings.max_bet,
                start_balance: self.settings.start_balance,
                min_players: self.settings.min_players,
            },
            players,
            player_list,
            game_state: GameStateView {
                status: self.round.phase,
                status_message: self.status_message(),
                current_player: self.round.current_player.as_ref().map(Nickname::to_string),
                dealer_hand,
                dealer_value,
                player_count: self.registry.len(),
            },
            stats: StatsView {
                active_players: self.registry.iter().filter(|p| p.status.is_active()).count(),
                total_players: self.registry.len(),
            },
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn phase(&self) -> Phase {
        self.round.phase
    }

    pub fn current_player(&self) -> Option<&Nickname> {
        self.round.current_player.as_ref()
    }

    pub fn dealer_hand(&self) -> &[Card] {
        &self.round.dealer_hand
    }

    pub fn dealer_revealed(&self) -> bool {
        self.round.phase.reveals_dealer()
    }

    /// Increments every time cards are dealt.
    pub fn round_number(&self) -> u64 {
        self.round.round
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn player(&self, nickname: &str) -> Option<&Player> {
        self.registry.get(nickname)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.registry.iter()
    }

    pub fn nickname_of(&self, connection: ConnectionId) -> Option<&Nickname> {
        self.registry.by_connection(connection).map(|p| &p.nickname)
    }

    pub fn connection_of(&self, nickname: &str) -> Option<ConnectionId> {
        self.registry.get(nickname).map(|p| p.connection)
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    // --- Transitions ---

    fn try_enter_betting(&mut self) {
        if self.round.phase == Phase::Waiting && self.registry.len() >= self.settings.min_players {
            info!("{} player(s) connected, betting opens", self.registry.len());
            self.round.phase = Phase::Betting;
        }
    }

    /// Deals once every connected session has committed a bet.
    fn try_start_round(&mut self) {
        if self.round.phase != Phase::Betting || self.registry.is_empty() {
            return;
        }
        let all_committed = self
            .registry
            .iter()
            .all(|p| p.status == PlayerStatus::Ready && p.bet > 0);
        if all_committed {
            self.deal();
        }
    }

    fn deal(&mut self) {
        self.round.round += 1;
        self.round.deck = (self.deck_factory)();
        self.round.dealer_hand = vec![self.round.deck.draw(), self.round.deck.draw()];
        self.round.notice = None;

        let deck = &mut self.round.deck;
        for player in self
            .registry
            .iter_mut()
            .filter(|p| p.status == PlayerStatus::Ready && p.bet > 0)
        {
            player.hand = vec![deck.draw(), deck.draw()];
            player.status = PlayerStatus::Playing;
            player.result = None;
        }

        self.round.phase = Phase::Playing;
        self.round.current_player = self
            .registry
            .iter()
            .find(|p| p.status == PlayerStatus::Playing)
            .map(|p| p.nickname.clone());

        info!(
            "round {} dealt, first to act: {:?}",
            self.round.round, self.round.current_player
        );
        self.events
            .push_back(GameEvent::RoundStarted(self.round.round));

        if self.round.current_player.is_none() {
            self.enter_dealer_turn();
        }
    }

    /// Hands the turn to the first `playing` seat at or after `start`,
    /// wrapping around. With nobody left, the dealer takes over.
    fn advance_turn_from(&mut self, start: usize) {
        let seats = self.registry.len();
        let next = (0..seats)
            .map(|offset| (start + offset) % seats)
            .filter_map(|idx| self.registry.seat(idx))
            .find(|p| p.status == PlayerStatus::Playing)
            .map(|p| p.nickname.clone());

        match next {
            Some(nickname) => {
                debug!("turn passes to {nickname}");
                self.round.current_player = Some(nickname);
            }
            None => self.enter_dealer_turn(),
        }
    }

    fn enter_dealer_turn(&mut self) {
        self.round.current_player = None;
        self.round.phase = Phase::DealerTurn;
        info!(
            "dealer reveals {}",
            hand_value(&self.round.dealer_hand)
        );
    }

    fn abort_round(&mut self, reason: &str) {
        warn!("round {} aborted: {reason}", self.round.round);
        self.round.phase = Phase::Ended;
        self.round.current_player = None;
        self.round.notice = Some(reason.to_string());
        self.events
            .push_back(GameEvent::RoundAborted(reason.to_string()));
    }

    /// Starts the next round's betting once every session has cleared its
    /// hand.
    fn reopen_betting_if_ready(&mut self) {
        let everyone_waiting = self
            .registry
            .iter()
            .all(|p| matches!(p.status, PlayerStatus::Waiting | PlayerStatus::Ready));
        if everyone_waiting {
            self.reset_to_waiting();
            self.try_enter_betting();
        }
    }

    fn reset_to_waiting(&mut self) {
        self.round.phase = Phase::Waiting;
        self.round.current_player = None;
        self.round.dealer_hand.clear();
        self.round.notice = None;
    }

    fn status_message(&self) -> String {
        match self.round.phase {
            Phase::Waiting => format!(
                "Waiting for players ({}/{} needed)",
                self.registry.len(),
                self.settings.min_players
            ),
            Phase::Betting => "Betting phase - place your bets".to_string(),
            Phase::Playing => match &self.round.current_player {
                Some(nickname) => format!("Turn: {nickname}"),
                None => "Playing".to_string(),
            },
            Phase::DealerTurn => "Dealer's turn...".to_string(),
            Phase::Ended => self
                .round
                .notice
                .clone()
                .unwrap_or_else(|| "Round over".to_string()),
        }
    }

    fn player_view(&self, player: &Player) -> PlayerView {
        PlayerView {
            hand: player.hand.iter().map(Card::to_string).collect(),
            hand_value: hand_value(&player.hand),
            bet: player.bet,
            balance: player.balance,
            status: player.status,
            result: match (player.status, player.result) {
                (PlayerStatus::Playing, _) | (_, None) => String::new(),
                (_, Some(outcome)) => outcome.to_string(),
            },
            is_current: self.round.current_player.as_ref() == Some(&player.nickname),
        }
    }

    // --- Validation ---

    fn require_registered(&self, connection: ConnectionId) -> Result<(), RuleViolation> {
        self.registry
            .by_connection(connection)
            .map(|_| ())
            .ok_or(RuleViolation::NotRegistered)
    }

    fn require_phase(&self, expected: Phase) -> Result<(), RuleViolation> {
        if self.round.phase == expected {
            Ok(())
        } else {
            Err(RuleViolation::WrongPhase {
                expected,
                actual: self.round.phase,
            })
        }
    }

    /// Returns the caller's seat when it holds the turn.
    fn require_turn(&self, connection: ConnectionId) -> Result<usize, RuleViolation> {
        let seat = self
            .registry
            .seat_of_connection(connection)
            .ok_or(RuleViolation::NotRegistered)?;
        self.require_phase(Phase::Playing)?;

        let holds_turn = self
            .registry
            .seat(seat)
            .is_some_and(|p| self.round.current_player.as_ref() == Some(&p.nickname));
        if holds_turn {
            Ok(seat)
        } else {
            Err(RuleViolation::OutOfTurn)
        }
    }
}
