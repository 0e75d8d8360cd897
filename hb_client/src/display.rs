//! Plain-text rendering of server messages.

use chrono::{DateTime, Local};
use house_blackjack::{TableSnapshot, messages::ServerMessage};
use std::fmt::Write;

/// Text to print for a server message, if any.
///
/// `nick_request` is answered by the connection loop, not shown.
pub fn render_message(message: &ServerMessage, me: &str) -> Option<String> {
    match message {
        ServerMessage::NickRequest { .. } => None,
        ServerMessage::Error { message } => Some(format!("! {message}")),
        ServerMessage::State(snapshot) => Some(render_snapshot(snapshot, me)),
        ServerMessage::PlayerJoined { message, .. } | ServerMessage::PlayerLeft { message, .. } => {
            Some(format!("* {message}"))
        }
        ServerMessage::Chat { from, text, ts } => Some(format!("[{}] {from}: {text}", clock(*ts))),
        ServerMessage::ServerMessage { message } => Some(format!("*** {message}")),
    }
}

/// Multi-line table summary, one line per player in nickname order.
pub fn render_snapshot(snapshot: &TableSnapshot, me: &str) -> String {
    let game = &snapshot.game_state;
    let mut out = format!("== {} ==\n", game.status_message);

    let dealer = game.dealer_hand.join(" ");
    match game.dealer_value {
        Some(value) => {
            let _ = writeln!(out, "  Dealer: {dealer} ({value})");
        }
        None if game.dealer_hand.is_empty() => {}
        None => {
            let _ = writeln!(out, "  Dealer: {dealer}");
        }
    }

    for entry in &snapshot.player_list {
        let view = &entry.view;
        let marker = if view.is_current { ">" } else { " " };
        let you = if entry.nickname == me { " (you)" } else { "" };
        let _ = write!(
            out,
            "{marker} {}{you}: balance {} bet {} [{}]",
            entry.nickname,
            view.balance,
            view.bet,
            format!("{:?}", view.status).to_lowercase()
        );
        if !view.hand.is_empty() {
            let _ = write!(out, " {} ({})", view.hand.join(" "), view.hand_value);
        }
        if !view.result.is_empty() {
            let _ = write!(out, " {}", view.result);
        }
        out.push('\n');
    }

    out.truncate(out.trim_end().len());
    out
}

fn clock(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
