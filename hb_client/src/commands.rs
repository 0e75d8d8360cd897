use house_blackjack::messages::ClientMessage;
use serde_json::Value;
use std::fmt;

/// Help text printed by the `help` command.
pub const HELP_TEXT: &str = "\
Commands:
  bet N      Place or replace your bet for this round
  hit        Draw a card
  stand      End your turn
  new        Ask for the next round once this one is over
  say TEXT   Send a chat message
  help       Show this help
  quit       Leave the table";

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Forward a message to the server.
    Send(ClientMessage),
    Help,
    Quit,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Bet amount is not a positive whole number.
    InvalidBetAmount(String),
    /// Bet command without an amount.
    MissingBetAmount,
    /// Chat command without any text.
    EmptyChat,
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBetAmount(value) => write!(
                f,
                "Invalid bet amount '{}'. Must be a positive number (e.g., 'bet 10')",
                value
            ),
            Self::MissingBetAmount => write!(f, "Bet requires an amount (e.g., 'bet 10')"),
            Self::EmptyChat => write!(f, "Nothing to say (e.g., 'say hello')"),
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{}'. Type 'help' to see available commands",
                cmd
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a line of user input.
///
/// # Examples
///
/// ```
/// use hb_client::commands::{Command, parse_command};
/// use house_blackjack::messages::ClientMessage;
///
/// assert_eq!(parse_command("hit"), Ok(Command::Send(ClientMessage::Hit)));
/// assert_eq!(parse_command("quit"), Ok(Command::Quit));
/// assert!(parse_command("bet lots").is_err());
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();

    match trimmed {
        "hit" | "h" => return Ok(Command::Send(ClientMessage::Hit)),
        "stand" | "s" => return Ok(Command::Send(ClientMessage::Stand)),
        "new" => return Ok(Command::Send(ClientMessage::NewRound)),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        _ => {}
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    match verb {
        "bet" | "b" => parse_bet(rest),
        "say" => {
            if rest.is_empty() {
                Err(ParseError::EmptyChat)
            } else {
                Ok(Command::Send(ClientMessage::Chat {
                    text: rest.to_string(),
                }))
            }
        }
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse a bet command's argument: "bet N"
fn parse_bet(arg: &str) -> Result<Command, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingBetAmount);
    }
    match arg.parse::<i64>() {
        Ok(amount) if amount > 0 => Ok(Command::Send(ClientMessage::Bet {
            amount: Value::from(amount),
        })),
        _ => Err(ParseError::InvalidBetAmount(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Single-word command tests ===

    #[test]
    fn test_parse_hit() {
        assert_eq!(parse_command("hit"), Ok(Command::Send(ClientMessage::Hit)));
        assert_eq!(parse_command("h"), Ok(Command::Send(ClientMessage::Hit)));
    }

    #[test]
    fn test_parse_stand() {
        assert_eq!(parse_command("stand"), Ok(Command::Send(ClientMessage::Stand)));
    }

    #[test]
    fn test_parse_new_round() {
        assert_eq!(
            parse_command("new"),
            Ok(Command::Send(ClientMessage::NewRound))
        );
    }

    #[test]
    fn test_parse_help_and_quit() {
        assert_eq!(parse_command("help"), Ok(Command::Help));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    // === Whitespace handling ===

    #[test]
    fn test_parse_with_surrounding_whitespace() {
        assert_eq!(
            parse_command("  stand  "),
            Ok(Command::Send(ClientMessage::Stand))
        );
    }

    // === Bet ===

    #[test]
    fn test_parse_bet() {
        assert_eq!(
            parse_command("bet 25"),
            Ok(Command::Send(ClientMessage::Bet {
                amount: Value::from(25)
            }))
        );
    }

    #[test]
    fn test_parse_bet_missing_amount() {
        assert_eq!(parse_command("bet"), Err(ParseError::MissingBetAmount));
    }

    #[test]
    fn test_parse_bet_rejects_bad_amounts() {
        for input in ["bet ten", "bet 0", "bet -5", "bet 1.5"] {
            assert!(
                matches!(parse_command(input), Err(ParseError::InvalidBetAmount(_))),
                "{input} should be rejected"
            );
        }
    }

    // === Chat ===

    #[test]
    fn test_parse_say_keeps_inner_spacing() {
        assert_eq!(
            parse_command("say good  luck all"),
            Ok(Command::Send(ClientMessage::Chat {
                text: "good  luck all".to_string()
            }))
        );
    }

    #[test]
    fn test_parse_say_without_text() {
        assert_eq!(parse_command("say"), Err(ParseError::EmptyChat));
        assert_eq!(parse_command("say   "), Err(ParseError::EmptyChat));
    }

    // === Errors ===

    #[test]
    fn test_unrecognized_command() {
        let err = parse_command("double").unwrap_err();
        assert_eq!(err, ParseError::UnrecognizedCommand("double".to_string()));
        assert!(err.to_string().contains("help"));
    }
}
