//! Core value types: cards, the draw pile, player identity, RNG.

pub mod card;
pub mod deck;
pub mod player;
pub mod rng;

pub use card::{can_cover, Card, Rank, Suit};
pub use deck::{Deck, DECK_SIZE};
pub use player::{PlayerId, PlayerMap, PlayerRecord};
pub use rng::GameRng;
