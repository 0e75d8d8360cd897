/// Hard cap on a single wager.
pub const DEFAULT_MAX_BET: i64 = 100_000;

/// Balance every session starts with.
pub const DEFAULT_START_BALANCE: i64 = 100;

/// Connected sessions required before betting opens.
pub const DEFAULT_MIN_PLAYERS: usize = 1;

/// Longest chat message that gets rebroadcast.
pub const DEFAULT_MAX_CHAT_LEN: usize = 500;

/// Nicknames are truncated to this many characters after sanitizing.
pub const MAX_NICKNAME_LEN: usize = 20;

/// The dealer draws while below this value.
pub const DEALER_STANDS_ON: u32 = 17;

/// Highest non-busting hand value.
pub const BLACKJACK: u32 = 21;

/// Placeholder shown in place of the dealer's hole card.
pub const HIDDEN_CARD: &str = "[hidden]";

/// Cards in a fresh deck.
pub const DECK_SIZE: usize = 52;
