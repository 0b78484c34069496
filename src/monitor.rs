//! Perfect-information card tracking.
//!
//! The monitor keeps, from the coordinator's point of view, the cards
//! each player currently holds and the two table piles. It is mutated
//! exclusively by the move engine, which feeds it the `AppliedMove`
//! record of every committed move — each update touches only the cards
//! the move touched, never a rescan of full state. External code gets
//! read-only views (`hand_of`, `table_uncovered`, `table_covered`) for
//! reporting and AI evaluation.
//!
//! What an individual player agent is allowed to assume is a different
//! question, answered by `PlayerView`; the monitor is the engine's own
//! ground truth and part of the snapshot/restore scope.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::{Card, PlayerId, PlayerMap};
use crate::moves::{AppliedMove, Move};

fn remove_one(pile: &mut Vector<Card>, card: Card) -> bool {
    if let Some(pos) = pile.iter().position(|&c| c == card) {
        pile.remove(pos);
        true
    } else {
        false
    }
}

/// Tracks per-player hand membership and the table piles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMonitor {
    hands: PlayerMap<Vector<Card>>,
    to_cover: Vector<Card>,
    covered: Vector<Card>,
}

impl CardMonitor {
    /// Create an empty monitor for `player_count` players.
    #[must_use]
    pub fn new(player_count: usize) -> Self {
        Self {
            hands: PlayerMap::with_default(player_count),
            to_cover: Vector::new(),
            covered: Vector::new(),
        }
    }

    /// Load the dealt hands at game start.
    pub fn start(&mut self, hands: &PlayerMap<Vector<Card>>) {
        self.hands = hands.clone();
        self.to_cover.clear();
        self.covered.clear();
    }

    /// Read-only view of a player's known hand.
    #[must_use]
    pub fn hand_of(&self, player: PlayerId) -> &Vector<Card> {
        &self.hands[player]
    }

    /// Cards on the table still awaiting a cover.
    #[must_use]
    pub fn table_uncovered(&self) -> &Vector<Card> {
        &self.to_cover
    }

    /// Cards already covered this turn (covers included).
    #[must_use]
    pub fn table_covered(&self) -> &Vector<Card> {
        &self.covered
    }

    /// Record a trump swap at game start: `taken` leaves the player's
    /// hand and `given` (the original trump card) enters it.
    pub fn swap_trump(&mut self, player: PlayerId, taken: Card, given: Card) {
        let removed = remove_one(&mut self.hands[player], taken);
        debug_assert!(removed, "trump swap for a card not in hand");
        self.hands[player].push_back(given);
    }

    /// Apply the incremental effect of a committed move.
    pub fn on_move_applied(&mut self, applied: &AppliedMove) {
        let actor = applied.actor;
        match &applied.mv {
            Move::InitialPlay { cards }
            | Move::PlayToOther { cards }
            | Move::PlayToSelf { cards } => {
                for &card in cards {
                    let removed = remove_one(&mut self.hands[actor], card);
                    debug_assert!(removed, "played card not in monitored hand");
                    self.to_cover.push_back(card);
                }
                for &card in &applied.drawn {
                    self.hands[actor].push_back(card);
                }
            }
            Move::PlayToSelfFromDeck => {
                for &card in &applied.drawn {
                    self.to_cover.push_back(card);
                }
            }
            Move::PlayFallFromHand { pairs } => {
                for pair in pairs {
                    let removed = remove_one(&mut self.hands[actor], pair.cover);
                    debug_assert!(removed, "covering card not in monitored hand");
                    let removed = remove_one(&mut self.to_cover, pair.covered);
                    debug_assert!(removed, "covered card not on monitored table");
                    self.covered.push_back(pair.covered);
                    self.covered.push_back(pair.cover);
                }
            }
            Move::PlayFallFromDeck { covered } => {
                let drawn = applied.drawn[0];
                if applied.kople_covered {
                    let removed = remove_one(&mut self.to_cover, *covered);
                    debug_assert!(removed, "covered card not on monitored table");
                    self.covered.push_back(*covered);
                    self.covered.push_back(drawn);
                } else {
                    self.to_cover.push_back(drawn);
                }
            }
            Move::EndTurn { .. } => {
                // Whatever the target did not lift has left the table
                // for the discard, which the monitor does not track.
                self.to_cover.clear();
                self.covered.clear();
                for &card in &applied.picked_up {
                    self.hands[actor].push_back(card);
                }
                for &card in &applied.drawn {
                    self.hands[actor].push_back(card);
                }
            }
            Move::Skip => {}
        }
    }
}
