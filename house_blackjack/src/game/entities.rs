use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

use super::constants::DECK_SIZE;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "Clubs",
            Self::Diamonds => "Diamonds",
            Self::Hearts => "Hearts",
            Self::Spades => "Spades",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Blackjack points before any soft-ace reduction. Aces count 11.
    pub fn points(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
            Self::Ace => 11,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Jack => write!(f, "J"),
            Self::Queen => write!(f, "Q"),
            Self::King => write!(f, "K"),
            Self::Ace => write!(f, "A"),
            other => write!(f, "{}", other.points()),
        }
    }
}

/// A playing card. Cards have no identity beyond their value.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Card(pub Rank, pub Suit);

impl Card {
    pub fn rank(&self) -> Rank {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} of {}", self.rank(), self.suit())
    }
}

/// An ordered pile of cards. The top of the deck is the end of the vector.
///
/// Drawing never fails: an exhausted deck is replaced by a freshly shuffled
/// 52-card deck before the draw happens.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// All 52 cards in suit-major order, unshuffled.
    pub fn ordered() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card(rank, suit));
            }
        }
        Self { cards }
    }

    pub fn shuffled() -> Self {
        Self::shuffled_with(&mut rand::rng())
    }

    /// Uniform permutation of a full deck (Fisher-Yates via `SliceRandom`).
    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::ordered();
        deck.cards.shuffle(rng);
        deck
    }

    /// A deck that deals `cards` in the given order, first element first.
    pub fn stacked(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Self { cards }
    }

    pub fn draw(&mut self) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            log::debug!("deck exhausted, reshuffling a fresh deck");
            *self = Self::shuffled();
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::shuffled()
    }
}

/// Identifies one transport connection for the lifetime of that connection.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A sanitized, unique player name. Immutable once assigned.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nickname(String);

impl Nickname {
    pub(crate) fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Nickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for Nickname {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Nickname {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Nickname {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Shared round lifecycle.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Waiting,
    Betting,
    Playing,
    DealerTurn,
    Ended,
}

impl Phase {
    /// The dealer's hole card is visible only once the dealer starts acting.
    pub fn reveals_dealer(self) -> bool {
        matches!(self, Self::DealerTurn | Self::Ended)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Betting => "betting",
            Self::Playing => "playing",
            Self::DealerTurn => "dealer_turn",
            Self::Ended => "ended",
        };
        write!(f, "{repr}")
    }
}

/// Per-session status. `Ready` means a bet has been committed.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Waiting,
    Ready,
    Playing,
    Stand,
    Bust,
}

impl PlayerStatus {
    /// Counted as taking part in the active round for abort checks.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Ready)
    }

    /// Holds a hand that must be settled when the dealer finishes.
    pub fn awaits_settlement(self) -> bool {
        matches!(self, Self::Stand | Self::Bust)
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Stand => "stand",
            Self::Bust => "bust",
        };
        write!(f, "{repr}")
    }
}

/// How a hand finished.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Push,
    Lose,
    Bust,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Win => "Win!",
            Self::Push => "Push",
            Self::Lose => "Lose",
            Self::Bust => "Bust!",
        };
        write!(f, "{repr}")
    }
}

/// A connected player's live state. The connection id is the only link to
/// the transport; the game core never touches sockets.
#[derive(Clone, Debug)]
pub struct Player {
    pub nickname: Nickname,
    pub connection: ConnectionId,
    pub balance: i64,
    pub hand: Vec<Card>,
    pub bet: i64,
    pub status: PlayerStatus,
    pub result: Option<Outcome>,
}

impl Player {
    pub fn new(nickname: Nickname, connection: ConnectionId, balance: i64) -> Self {
        Self {
            nickname,
            connection,
            balance,
            hand: Vec::new(),
            bet: 0,
            status: PlayerStatus::Waiting,
            result: None,
        }
    }

    /// Clears everything tied to the previous round.
    pub fn reset_for_next_round(&mut self) {
        self.hand.clear();
        self.bet = 0;
        self.result = None;
        self.status = PlayerStatus::Waiting;
    }
}
