//! Card value types and the cover relation.
//!
//! A `Card` is an immutable (rank, suit) pair drawn from the 52-card
//! universe. Identity, hashing and ordering are based solely on
//! (rank, suit); the `kopled` annotation (set when a card is exposed on
//! the table via a deck draw) never affects identity, so two cards with
//! the same rank and suit are interchangeable.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Card rank: 2..=14, where 11=J, 12=Q, 13=K and 14=A.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u8);

impl Rank {
    /// Lowest rank in the deck.
    pub const MIN: Rank = Rank(2);
    /// Highest rank in the deck (ace).
    pub const MAX: Rank = Rank(14);

    /// Create a new rank.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Iterate over all ranks, lowest first.
    pub fn all() -> impl Iterator<Item = Rank> {
        (Self::MIN.0..=Self::MAX.0).map(Rank)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            11 => write!(f, "J"),
            12 => write!(f, "Q"),
            13 => write!(f, "K"),
            14 => write!(f, "A"),
            v => write!(f, "{v}"),
        }
    }
}

/// Card suit. Display uses the unicode symbol (`♣`, `♦`, `♥`, `♠`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    /// All four suits, in a fixed order.
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    /// The unicode symbol for this suit.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        }
    }
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// An immutable card value with a mutable, non-identity annotation.
///
/// `kopled` marks a card that landed on the table via a deck draw
/// (`PlayToSelfFromDeck` / `PlayFallFromDeck`). It is ignored by
/// equality, hashing and ordering.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    pub kopled: bool,
}

impl Card {
    /// Create a card. The annotation flag starts cleared.
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self {
            rank,
            suit,
            kopled: false,
        }
    }

    /// Shorthand for `Card::new(Rank::new(rank), suit)`.
    #[must_use]
    pub const fn of(rank: u8, suit: Suit) -> Self {
        Self::new(Rank::new(rank), suit)
    }

    /// Copy of this card with the `kopled` annotation set.
    #[must_use]
    pub const fn as_kopled(mut self) -> Self {
        self.kopled = true;
        self
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.suit == other.suit
    }
}

impl Eq for Card {}

impl Hash for Card {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
        self.suit.hash(state);
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.rank, self.suit).cmp(&(other.rank, other.suit))
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// The cover relation: can `played` neutralize `fall` on the table?
///
/// True iff `played` has the same suit as `fall` and a higher rank, or
/// `played` is trump and `fall` is not. A card never covers itself, and
/// trump-on-trump still requires the higher rank.
#[must_use]
pub fn can_cover(played: Card, fall: Card, trump: Suit) -> bool {
    if played.suit == fall.suit && played.rank > fall.rank {
        return true;
    }
    played.suit == trump && fall.suit != trump
}
