//! Pure helpers over cards and nicknames.

use super::{
    constants::{BLACKJACK, MAX_NICKNAME_LEN},
    entities::{Card, Rank},
};

/// Blackjack value of a hand.
///
/// Face cards count 10 and aces count 11. While the total is over 21 and an
/// ace is still counted as 11, that ace drops to 1.
///
/// # Examples
///
/// ```
/// use house_blackjack::game::{entities::{Card, Rank, Suit}, functional::hand_value};
///
/// let soft = [Card(Rank::Ace, Suit::Hearts), Card(Rank::Six, Suit::Clubs)];
/// assert_eq!(hand_value(&soft), 17);
///
/// let hard = [
///     Card(Rank::Ace, Suit::Hearts),
///     Card(Rank::Six, Suit::Clubs),
///     Card(Rank::King, Suit::Spades),
/// ];
/// assert_eq!(hand_value(&hard), 17);
/// ```
pub fn hand_value(cards: &[Card]) -> u32 {
    let mut total: u32 = cards.iter().map(|card| card.rank().points()).sum();
    let mut soft_aces = cards.iter().filter(|card| card.rank() == Rank::Ace).count();

    while total > BLACKJACK && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }

    total
}

pub fn is_bust(cards: &[Card]) -> bool {
    hand_value(cards) > BLACKJACK
}

/// Strips everything except ASCII letters, digits, underscores, whitespace and
/// hyphens, trims, then keeps at most `MAX_NICKNAME_LEN` characters.
///
/// Truncation can expose trailing whitespace, which is trimmed as well.
pub fn sanitize_nickname(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let truncated: String = kept.trim().chars().take(MAX_NICKNAME_LEN).collect();
    truncated.trim_end().to_string()
}
