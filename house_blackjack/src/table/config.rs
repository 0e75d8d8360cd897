//! Table configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::game::{GameSettings, constants::DEFAULT_MAX_CHAT_LEN};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TableConfigError {
    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },
}

/// Everything the table actor needs, fixed at process start.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableConfig {
    pub game: GameSettings,

    /// Chat messages longer than this (in characters) are dropped
    pub max_chat_len: usize,

    /// Pause before each dealer draw, in milliseconds (0 disables pacing)
    pub dealer_delay_ms: u64,

    /// Frames buffered per connection before sends count as backpressure
    pub outbound_buffer: usize,

    /// Time a raw TCP client gets to send its nickname
    pub handshake_timeout_secs: u64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            game: GameSettings::default(),
            max_chat_len: DEFAULT_MAX_CHAT_LEN,
            dealer_delay_ms: 1000,
            outbound_buffer: 256,
            handshake_timeout_secs: 30,
        }
    }
}

impl TableConfig {
    pub fn dealer_delay(&self) -> Duration {
        Duration::from_millis(self.dealer_delay_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), TableConfigError> {
        let checks = [
            ("max_bet", self.game.max_bet > 0),
            ("start_balance", self.game.start_balance > 0),
            ("min_players", self.game.min_players > 0),
            ("max_chat_len", self.max_chat_len > 0),
            ("outbound_buffer", self.outbound_buffer > 0),
            ("handshake_timeout_secs", self.handshake_timeout_secs > 0),
        ];
        match checks.iter().find(|(_, ok)| !ok) {
            Some(&(field, _)) => Err(TableConfigError::MustBePositive { field }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TableConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.max_bet, 100_000);
        assert_eq!(config.game.start_balance, 100);
        assert_eq!(config.max_chat_len, 500);
        assert_eq!(config.dealer_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_min_players_is_rejected() {
        let mut config = TableConfig::default();
        config.game.min_players = 0;
        assert_eq!(
            config.validate(),
            Err(TableConfigError::MustBePositive {
                field: "min_players"
            })
        );
    }

    #[test]
    fn test_zero_dealer_delay_is_allowed() {
        let config = TableConfig {
            dealer_delay_ms: 0,
            ..TableConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
