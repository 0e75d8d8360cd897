//! Public, serializable views of the table.
//!
//! A snapshot is always the full public state, never a diff. The dealer's hole
//! card is replaced by [`HIDDEN_CARD`](super::constants::HIDDEN_CARD) until
//! the dealer acts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entities::{Phase, PlayerStatus};

/// Fixed table rules, echoed in every snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RulesView {
    pub max_bet: i64,
    pub start_balance: i64,
    pub min_players: usize,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub hand: Vec<String>,
    pub hand_value: u32,
    pub bet: i64,
    pub balance: i64,
    pub status: PlayerStatus,
    /// Outcome label, empty while the hand is still being played.
    pub result: String,
    pub is_current: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerListEntry {
    pub nickname: String,
    #[serde(flatten)]
    pub view: PlayerView,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameStateView {
    pub status: Phase,
    pub status_message: String,
    pub current_player: Option<String>,
    pub dealer_hand: Vec<String>,
    pub dealer_value: Option<u32>,
    pub player_count: usize,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatsView {
    pub active_players: usize,
    pub total_players: usize,
}

/// Full public state of the table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableSnapshot {
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub server_time: String,
    pub rules: RulesView,
    pub players: BTreeMap<String, PlayerView>,
    /// Players sorted by nickname.
    pub player_list: Vec<PlayerListEntry>,
    pub game_state: GameStateView,
    pub stats: StatsView,
}

impl TableSnapshot {
    pub fn phase(&self) -> Phase {
        self.game_state.status
    }

    pub fn player(&self, nickname: &str) -> Option<&PlayerView> {
        self.players.get(nickname)
    }
}
