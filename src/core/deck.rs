//! The draw pile.
//!
//! An ordered, shrinking sequence of cards. Created once per game with a
//! seed (or supplied pre-built for tests); cards leave from the top, and
//! the only card that ever returns is the displaced trump card, placed
//! at the bottom during game setup.
//!
//! Backed by `im::Vector` so a deck clone inside a snapshot is O(1).

use im::Vector;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::card::{Card, Rank, Suit};
use super::rng::GameRng;

/// Number of cards in the full deck.
pub const DECK_SIZE: usize = 52;

/// An ordered draw pile. The front of the vector is the top of the deck.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vector<Card>,
}

impl Deck {
    /// Build the full 52-card deck, shuffled with the game RNG.
    #[must_use]
    pub fn standard(rng: &mut GameRng) -> Self {
        let mut cards: Vec<Card> = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::all() {
                cards.push(Card::new(rank, suit));
            }
        }
        rng.shuffle(&mut cards);
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    /// Build the full deck in fixed rank-within-suit order, unshuffled.
    ///
    /// Useful for deterministic tests and pre-supplied decks.
    #[must_use]
    pub fn ordered() -> Self {
        let mut cards = Vector::new();
        for suit in Suit::ALL {
            for rank in Rank::all() {
                cards.push_back(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    /// Build a deck from an explicit top-to-bottom ordering.
    #[must_use]
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    /// Number of cards remaining.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck is exhausted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Draw the top card, if any.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop_front()
    }

    /// Draw up to `n` cards from the top.
    ///
    /// Returns fewer than `n` when the deck runs out.
    pub fn draw_up_to(&mut self, n: usize) -> SmallVec<[Card; 8]> {
        let mut out = SmallVec::new();
        for _ in 0..n {
            match self.draw() {
                Some(card) => out.push(card),
                None => break,
            }
        }
        out
    }

    /// Place a card at the bottom of the deck (trump relocation).
    pub fn place_bottom(&mut self, card: Card) {
        self.cards.push_back(card);
    }

    /// The card at the bottom of the deck, if any.
    #[must_use]
    pub fn peek_bottom(&self) -> Option<Card> {
        self.cards.back().copied()
    }

    /// Iterate over the remaining cards, top first.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_standard_deck_has_52_unique_cards() {
        let mut rng = GameRng::new(42);
        let deck = Deck::standard(&mut rng);

        assert_eq!(deck.len(), DECK_SIZE);

        let mut counts: HashMap<Card, usize> = HashMap::new();
        for card in deck.iter() {
            *counts.entry(*card).or_default() += 1;
        }
        assert_eq!(counts.len(), DECK_SIZE);
        assert!(counts.values().all(|&c| c == 1));
    }

    #[test]
    fn test_rank_distribution() {
        let deck = Deck::ordered();
        let mut per_rank: HashMap<Rank, usize> = HashMap::new();
        for card in deck.iter() {
            *per_rank.entry(card.rank).or_default() += 1;
        }
        for rank in Rank::all() {
            assert_eq!(per_rank[&rank], 4);
        }
    }

    #[test]
    fn test_seeded_shuffle_is_deterministic() {
        let mut rng_a = GameRng::new(42);
        let mut rng_b = GameRng::new(42);

        let a = Deck::standard(&mut rng_a);
        let b = Deck::standard(&mut rng_b);
        let order_a: Vec<Card> = a.iter().copied().collect();
        let order_b: Vec<Card> = b.iter().copied().collect();
        assert_eq!(order_a, order_b);
        assert_ne!(order_a, Deck::ordered().iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn test_draw_shrinks_from_top() {
        let mut deck = Deck::ordered();
        let top = *deck.iter().next().unwrap();

        let drawn = deck.draw().unwrap();
        assert_eq!(drawn, top);
        assert_eq!(deck.len(), DECK_SIZE - 1);
    }

    #[test]
    fn test_draw_up_to_stops_at_empty() {
        let mut deck = Deck::from_cards([
            Card::of(2, Suit::Clubs),
            Card::of(3, Suit::Clubs),
            Card::of(4, Suit::Clubs),
        ]);

        let drawn = deck.draw_up_to(6);
        assert_eq!(drawn.len(), 3);
        assert!(deck.is_empty());
        assert!(deck.draw().is_none());
    }

    #[test]
    fn test_place_bottom() {
        let mut deck = Deck::from_cards([Card::of(2, Suit::Clubs), Card::of(3, Suit::Clubs)]);
        let trump = Card::of(14, Suit::Spades);

        deck.place_bottom(trump);
        assert_eq!(deck.len(), 3);
        assert_eq!(deck.peek_bottom(), Some(trump));

        deck.draw();
        deck.draw();
        assert_eq!(deck.draw(), Some(trump));
    }
}
