//! Perspective-limited reads of the table.
//!
//! Agents never touch the `Table` directly: the coordinator clones a
//! [`PlayerView`] under the lock, releases it, and lets the agent think
//! on the copy. The view hides other players' hands (unless the table
//! was put in full-visibility mode) and carries everything needed to
//! enumerate candidate moves and encode the position.

use im::Vector;
use smallvec::SmallVec;

use crate::core::{can_cover, Card, PlayerId, Suit};
use crate::moves::{CoverPair, Move};

use super::{Table, HAND_SIZE};

/// What one seat's hand looks like from another seat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandView {
    /// Only the card count is known.
    Hidden(usize),
    /// The full hand (own hand, or full-visibility mode).
    Visible(Vector<Card>),
}

impl HandView {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            HandView::Hidden(n) => *n,
            HandView::Visible(cards) => cards.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One player's complete, self-contained picture of the game.
#[derive(Clone, Debug)]
pub struct PlayerView {
    pub player: PlayerId,
    pub hands: Vec<HandView>,
    pub to_cover: Vector<Card>,
    pub covered: Vector<Card>,
    pub trump_card: Card,
    pub deck_len: usize,
    pub target: PlayerId,
    pub initiator: Option<PlayerId>,
    pub ready: Vec<bool>,
    pub ranks: Vec<Option<u32>>,
}

impl PlayerView {
    #[must_use]
    pub fn from_table(table: &mut Table, player: PlayerId) -> Self {
        let initiator = table.initiator();
        let hands = PlayerId::all(table.player_count())
            .map(|p| {
                if p == player || table.full_visibility {
                    HandView::Visible(table.hands[p].clone())
                } else {
                    HandView::Hidden(table.hands[p].len())
                }
            })
            .collect();
        Self {
            player,
            hands,
            to_cover: table.to_cover.clone(),
            covered: table.covered.clone(),
            trump_card: table.trump_card,
            deck_len: table.deck.len(),
            target: table.target(),
            initiator,
            ready: table.players.iter().map(|(_, r)| r.ready).collect(),
            ranks: table.players.iter().map(|(_, r)| r.rank).collect(),
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.hands.len()
    }

    /// The viewing player's own cards.
    #[must_use]
    pub fn hand(&self) -> &Vector<Card> {
        match &self.hands[self.player.index()] {
            HandView::Visible(cards) => cards,
            HandView::Hidden(_) => unreachable!("own hand is always visible"),
        }
    }

    #[must_use]
    pub fn trump(&self) -> Suit {
        self.trump_card.suit
    }

    #[must_use]
    pub fn is_target(&self) -> bool {
        self.player == self.target
    }

    #[must_use]
    pub fn table_is_empty(&self) -> bool {
        self.to_cover.is_empty() && self.covered.is_empty()
    }

    /// Ranks currently playable onto the table.
    #[must_use]
    pub fn table_ranks(&self) -> Vec<crate::core::Rank> {
        let mut ranks: Vec<_> = self
            .to_cover
            .iter()
            .chain(self.covered.iter())
            .map(|c| c.rank)
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        ranks
    }

    /// How many more cards the target can be made to cover.
    #[must_use]
    pub fn attack_capacity(&self) -> usize {
        self.hands[self.target.index()]
            .len()
            .saturating_sub(self.to_cover.len())
    }

    /// Whether every other un-ranked player has skipped since the last
    /// table-changing move.
    #[must_use]
    pub fn others_ready(&self) -> bool {
        (0..self.player_count())
            .all(|i| i == self.player.index() || self.ranks[i].is_some() || self.ready[i])
    }

    /// Candidate moves for this position.
    ///
    /// The list over-approximates slightly on multi-card combinations
    /// (only singles and same-rank pairs are proposed) but every entry
    /// is legal under the current view. The engine remains the
    /// authority; agents built on this list still go through full
    /// validation.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        if self.ranks[self.player.index()].is_some() {
            return moves;
        }
        if self.is_target() {
            self.push_target_moves(&mut moves);
        } else {
            self.push_attacker_moves(&mut moves);
            moves.push(Move::Skip);
        }
        moves
    }

    fn push_attacker_moves(&self, moves: &mut Vec<Move>) {
        let hand = self.hand();
        if self.table_is_empty() {
            if self.initiator != Some(self.player) {
                return;
            }
            let capacity = self.hands[self.target.index()].len();
            if capacity == 0 {
                return;
            }
            for card in hand {
                moves.push(Move::InitialPlay {
                    cards: SmallVec::from_slice(&[*card]),
                });
            }
            if capacity >= 2 {
                for (i, a) in hand.iter().enumerate() {
                    for b in hand.iter().skip(i + 1) {
                        if a.rank == b.rank {
                            moves.push(Move::InitialPlay {
                                cards: SmallVec::from_slice(&[*a, *b]),
                            });
                        }
                    }
                }
            }
        } else if self.attack_capacity() > 0 {
            let ranks = self.table_ranks();
            for card in hand {
                if ranks.contains(&card.rank) {
                    moves.push(Move::PlayToOther {
                        cards: SmallVec::from_slice(&[*card]),
                    });
                }
            }
        }
    }

    fn push_target_moves(&self, moves: &mut Vec<Move>) {
        let hand = self.hand();
        for cover in hand {
            for covered in &self.to_cover {
                if can_cover(*cover, *covered, self.trump()) {
                    moves.push(Move::PlayFallFromHand {
                        pairs: SmallVec::from_slice(&[CoverPair {
                            cover: *cover,
                            covered: *covered,
                        }]),
                    });
                }
            }
        }
        if self.deck_len > 0 && !self.to_cover.is_empty() {
            for covered in &self.to_cover {
                moves.push(Move::PlayFallFromDeck { covered: *covered });
            }
        }
        if !self.table_is_empty() {
            let ranks = self.table_ranks();
            for card in hand {
                if ranks.contains(&card.rank) {
                    moves.push(Move::PlayToSelf {
                        cards: SmallVec::from_slice(&[*card]),
                    });
                }
            }
            if self.deck_len > 0 {
                moves.push(Move::PlayToSelfFromDeck);
            }
        }
        if self.others_ready() {
            moves.push(Move::EndTurn {
                take_covered: false,
            });
            if !self.to_cover.is_empty() && !self.covered.is_empty() {
                moves.push(Move::EndTurn { take_covered: true });
            }
        }
    }

    /// Flat feature encoding for evaluators.
    ///
    /// Layout: own hand (52 one-hot) | cards to cover (52) | covered
    /// cards (52) | trump suit (4) | deck fill (1) | per-seat hand
    /// fill, 8 fixed slots (8). Card index is `suit * 13 + rank - 2`.
    #[must_use]
    pub fn as_vector(&self) -> Vec<f32> {
        fn card_index(card: Card) -> usize {
            card.suit as usize * 13 + card.rank.0 as usize - 2
        }

        let mut v = vec![0.0f32; 52 * 3 + 4 + 1 + 8];
        for card in self.hand() {
            v[card_index(*card)] = 1.0;
        }
        for card in &self.to_cover {
            v[52 + card_index(*card)] = 1.0;
        }
        for card in &self.covered {
            v[104 + card_index(*card)] = 1.0;
        }
        v[156 + self.trump() as usize] = 1.0;
        v[160] = self.deck_len as f32 / crate::core::DECK_SIZE as f32;
        for (i, hand) in self.hands.iter().enumerate().take(8) {
            v[161 + i] = hand.len() as f32 / HAND_SIZE as f32;
        }
        v
    }
}
