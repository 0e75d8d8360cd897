use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::errors::ProtocolError;
use crate::game::{GameEvent, views::TableSnapshot};

pub const NICK_REQUEST_TEXT: &str = "Please enter your nickname:";
pub const SHUTDOWN_TEXT: &str = "Server is shutting down. Goodbye!";
pub const TIMEOUT_TEXT: &str = "Connection timed out";

/// A message from a client, tagged by `type`.
///
/// Unknown types and missing required fields fail to parse and are dropped.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Nickname handshake for message-oriented transports.
    Nickname {
        #[serde(default)]
        nickname: String,
    },
    Chat {
        #[serde(default)]
        text: String,
    },
    /// The amount is kept raw; see [`parse_amount`].
    Bet { amount: Value },
    Hit,
    Stand,
    NewRound,
}

impl ClientMessage {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nickname { nickname } => write!(f, "nickname {nickname:?}"),
            Self::Chat { text } => write!(f, "chat ({} chars)", text.chars().count()),
            Self::Bet { amount } => write!(f, "bet {amount}"),
            Self::Hit => write!(f, "hit"),
            Self::Stand => write!(f, "stand"),
            Self::NewRound => write!(f, "new_round"),
        }
    }
}

/// Lenient integer parse of a bet amount.
///
/// Integers are taken as is, fractional numbers are truncated, and strings
/// contribute their leading integer (`"25"`, `" 10.5"`, `"7 chips"`).
/// Anything else yields `None`.
pub fn parse_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// A message from the server, tagged by `type`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    NickRequest { message: String },
    /// Sent right before the server closes the connection.
    Error { message: String },
    State(TableSnapshot),
    PlayerJoined { nickname: String, message: String },
    PlayerLeft { nickname: String, message: String },
    Chat { from: String, text: String, ts: i64 },
    ServerMessage { message: String },
}

impl ServerMessage {
    pub fn nick_request() -> Self {
        Self::NickRequest {
            message: NICK_REQUEST_TEXT.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::ServerMessage {
            message: message.into(),
        }
    }

    pub fn shutdown() -> Self {
        Self::notice(SHUTDOWN_TEXT)
    }

    /// Wire form of a game event, if other sessions need to hear about it.
    pub fn from_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::PlayerJoined(nickname) => Some(Self::PlayerJoined {
                nickname: nickname.to_string(),
                message: event.to_string(),
            }),
            GameEvent::PlayerLeft(nickname) => Some(Self::PlayerLeft {
                nickname: nickname.to_string(),
                message: event.to_string(),
            }),
            GameEvent::RoundAborted(reason) => Some(Self::notice(reason.clone())),
            GameEvent::RoundStarted(_) | GameEvent::RoundSettled(_) => None,
        }
    }

    /// Serializes to a single JSON line without the trailing newline.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::game::BlackjackGame;

    #[test]
    fn test_parse_unit_commands() {
        assert_eq!(ClientMessage::parse(r#"{"type":"hit"}"#).unwrap(), ClientMessage::Hit);
        assert_eq!(
            ClientMessage::parse(r#"{"type":"stand","extra":1}"#).unwrap(),
            ClientMessage::Stand
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"new_round"}"#).unwrap(),
            ClientMessage::NewRound
        );
    }

    #[test]
    fn test_parse_bet_and_chat() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"bet","amount":10}"#).unwrap(),
            ClientMessage::Bet { amount: json!(10) }
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"chat","text":"hi"}"#).unwrap(),
            ClientMessage::Chat {
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_messages_fail() {
        assert!(matches!(
            ClientMessage::parse("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(ClientMessage::parse(r#"{"type":"fold"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"amount":5}"#).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(25)), Some(25));
        assert_eq!(parse_amount(&json!(-3)), Some(-3));
        assert_eq!(parse_amount(&json!(10.9)), Some(10));
        assert_eq!(parse_amount(&json!("40")), Some(40));
        assert_eq!(parse_amount(&json!(" 12.5")), Some(12));
        assert_eq!(parse_amount(&json!("7 chips")), Some(7));
        assert_eq!(parse_amount(&json!("chips")), None);
        assert_eq!(parse_amount(&json!("")), None);
        assert_eq!(parse_amount(&json!(null)), None);
        assert_eq!(parse_amount(&json!([1])), None);
    }

    #[test]
    fn test_server_message_tags() {
        let frame = ServerMessage::nick_request().to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "nick_request");
        assert_eq!(value["message"], NICK_REQUEST_TEXT);

        let frame = ServerMessage::shutdown().to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "server_message");
    }

    #[test]
    fn test_state_frame_is_flat() {
        let game = BlackjackGame::default();
        let frame = ServerMessage::State(game.snapshot()).to_frame().unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["game_state"]["status"], "waiting");
        assert_eq!(value["rules"]["max_bet"], 100_000);
        assert!(value["game_state"]["dealer_value"].is_null());
    }
}
