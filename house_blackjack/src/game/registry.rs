//! Nickname-keyed session registry.
//!
//! Sessions are kept in registration order. That order is the seat order used
//! for dealing and for the turn rotation.

use thiserror::Error;

use super::{
    entities::{ConnectionId, Nickname, Player},
    functional::sanitize_nickname,
};

/// Identity errors. The `Display` text is sent to the client before the
/// connection is closed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum JoinError {
    #[error("Invalid nickname. Please use only letters, digits and spaces.")]
    InvalidNickname,
    #[error("Nickname already taken. Please choose another one.")]
    NicknameTaken(String),
    #[error("This connection already has a nickname.")]
    AlreadyJoined,
}

#[derive(Debug)]
pub struct SessionRegistry {
    players: Vec<Player>,
    start_balance: i64,
}

impl SessionRegistry {
    pub fn new(start_balance: i64) -> Self {
        Self {
            players: Vec::new(),
            start_balance,
        }
    }

    /// Sanitizes `raw_nickname` and creates a session in `waiting` status.
    pub fn register(
        &mut self,
        connection: ConnectionId,
        raw_nickname: &str,
    ) -> Result<&Player, JoinError> {
        if self.by_connection(connection).is_some() {
            return Err(JoinError::AlreadyJoined);
        }

        let nickname = sanitize_nickname(raw_nickname);
        if nickname.is_empty() {
            return Err(JoinError::InvalidNickname);
        }
        if self.contains(&nickname) {
            return Err(JoinError::NicknameTaken(nickname));
        }

        self.players.push(Player::new(
            Nickname::new_unchecked(nickname),
            connection,
            self.start_balance,
        ));
        let idx = self.players.len() - 1;
        Ok(&self.players[idx])
    }

    /// Removes the session bound to `connection`, returning its seat index at
    /// the time of removal.
    pub fn remove(&mut self, connection: ConnectionId) -> Option<(usize, Player)> {
        let idx = self.seat_of_connection(connection)?;
        Some((idx, self.players.remove(idx)))
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.players.iter().any(|p| p.nickname == nickname)
    }

    pub fn get(&self, nickname: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.nickname == nickname)
    }

    pub fn by_connection(&self, connection: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.connection == connection)
    }

    pub fn by_connection_mut(&mut self, connection: ConnectionId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.connection == connection)
    }

    pub fn seat_of(&self, nickname: &str) -> Option<usize> {
        self.players.iter().position(|p| p.nickname == nickname)
    }

    pub fn seat_of_connection(&self, connection: ConnectionId) -> Option<usize> {
        self.players.iter().position(|p| p.connection == connection)
    }

    pub fn seat(&self, idx: usize) -> Option<&Player> {
        self.players.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::PlayerStatus;

    #[test]
    fn test_register_creates_waiting_session() {
        let mut registry = SessionRegistry::new(100);
        let player = registry.register(ConnectionId(1), "alice").unwrap();
        assert_eq!(player.nickname, "alice");
        assert_eq!(player.balance, 100);
        assert_eq!(player.status, PlayerStatus::Waiting);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_sanitizes() {
        let mut registry = SessionRegistry::new(100);
        let player = registry.register(ConnectionId(1), "  al*ice!  ").unwrap();
        assert_eq!(player.nickname, "alice");
    }

    #[test]
    fn test_duplicate_after_sanitizing_is_rejected() {
        let mut registry = SessionRegistry::new(100);
        registry.register(ConnectionId(1), "alice").unwrap();
        let err = registry.register(ConnectionId(2), "alice!!").unwrap_err();
        assert_eq!(err, JoinError::NicknameTaken("alice".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_nickname_is_rejected() {
        let mut registry = SessionRegistry::new(100);
        assert_eq!(
            registry.register(ConnectionId(1), "$$$").unwrap_err(),
            JoinError::InvalidNickname
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_connection_cannot_register_twice() {
        let mut registry = SessionRegistry::new(100);
        registry.register(ConnectionId(1), "alice").unwrap();
        assert_eq!(
            registry.register(ConnectionId(1), "bob").unwrap_err(),
            JoinError::AlreadyJoined
        );
    }

    #[test]
    fn test_remove_returns_seat() {
        let mut registry = SessionRegistry::new(100);
        registry.register(ConnectionId(1), "alice").unwrap();
        registry.register(ConnectionId(2), "bob").unwrap();
        registry.register(ConnectionId(3), "carol").unwrap();

        let (seat, player) = registry.remove(ConnectionId(2)).unwrap();
        assert_eq!(seat, 1);
        assert_eq!(player.nickname, "bob");
        assert_eq!(registry.seat_of("carol"), Some(1));
        assert!(registry.remove(ConnectionId(2)).is_none());
    }

    #[test]
    fn test_nickname_reusable_after_removal() {
        let mut registry = SessionRegistry::new(100);
        registry.register(ConnectionId(1), "alice").unwrap();
        registry.remove(ConnectionId(1));
        assert!(registry.register(ConnectionId(2), "alice").is_ok());
    }
}
