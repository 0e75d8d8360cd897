//! # House Blackjack
//!
//! A shared-table blackjack host: one authoritative game, any number of
//! connected players, and a dealer played by the house.
//!
//! Every round walks through the same phases:
//!
//! - **Waiting**: not enough sessions connected yet
//! - **Betting**: each session commits a bet
//! - **Playing**: sessions take turns to hit or stand, in seat order
//! - **DealerTurn**: the hole card is revealed and the dealer draws to 17
//! - **Ended**: hands are settled; sessions ask for the next round
//!
//! ## Core Modules
//!
//! - [`game`]: cards, hand evaluation, session registry and the round state
//!   machine
//! - [`net`]: JSON wire protocol, line framing and the transport interface
//! - [`table`]: the actor that serializes every mutation and broadcast
//!
//! ## Example
//!
//! ```
//! use house_blackjack::{BlackjackGame, entities::{ConnectionId, Phase}};
//!
//! let mut game = BlackjackGame::default();
//! game.join(ConnectionId(1), "alice").unwrap();
//! assert_eq!(game.phase(), Phase::Betting);
//!
//! game.place_bet(ConnectionId(1), 10).unwrap();
//! assert_eq!(game.phase(), Phase::Playing);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    BlackjackGame, GameEvent, GameSettings, JoinError, RuleViolation, TableSnapshot,
    constants::{self, DEFAULT_MAX_BET, DEFAULT_MIN_PLAYERS, DEFAULT_START_BALANCE},
    entities, functional,
};

/// Wire protocol and transport plumbing.
pub mod net;
pub use net::{messages, utils};

/// Serialized table actor.
pub mod table;
pub use table::{TableActor, TableConfig, TableHandle};
