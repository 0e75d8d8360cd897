//! Blackjack engine: cards, hand evaluation, sessions and the round state
//! machine.
//!
//! - `entities`: cards, deck, phases, player records
//! - `functional`: pure helpers (hand value, nickname sanitizing)
//! - `registry`: nickname-keyed sessions in seat order
//! - `state_machine`: the authoritative round lifecycle
//! - `views`: serializable table snapshots

pub mod constants;
pub mod entities;
pub mod functional;
pub mod registry;
pub mod state_machine;
pub mod views;

pub use registry::{JoinError, SessionRegistry};
pub use state_machine::{
    BlackjackGame, DeckFactory, GameEvent, GameSettings, RuleViolation, settle_outcome,
    settlement_delta,
};
pub use views::TableSnapshot;
