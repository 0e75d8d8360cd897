//! Internal modules for the blackjack client.
//!
//! Command parsing and message rendering used by the hb_client binary.

pub mod commands;
pub mod display;
