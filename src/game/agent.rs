//! Decision-makers driving player threads.
//!
//! An agent only ever sees a [`PlayerView`] cloned for it under the
//! lock; it decides on the copy, outside any critical section. A `None`
//! decision means "nothing to do right now" (typically a target waiting
//! for the others to skip) and the player loop retries later.

use crate::core::{Card, GameRng, Suit};
use crate::moves::Move;
use crate::table::view::PlayerView;

pub trait Agent: Send {
    fn decide(&mut self, view: &PlayerView) -> Option<Move>;
}

/// How reluctant we are to spend a card: trumps after everything else,
/// low ranks first.
fn card_weight(card: Card, trump: Suit) -> u32 {
    let base = u32::from(card.rank.0);
    if card.suit == trump {
        base + 13
    } else {
        base
    }
}

/// A deterministic greedy baseline: cover from hand when possible,
/// attack with the cheapest card, end the turn cleanly when allowed,
/// pick up only as a last resort.
#[derive(Clone, Copy, Debug, Default)]
pub struct BaselineAgent;

impl BaselineAgent {
    fn priority(mv: &Move, view: &PlayerView) -> (u32, u32) {
        let trump = view.trump();
        match mv {
            Move::PlayFallFromHand { pairs } => {
                let cost = pairs.iter().map(|p| card_weight(p.cover, trump)).sum();
                (0, cost)
            }
            Move::EndTurn { take_covered } => {
                if view.to_cover.is_empty() {
                    (1, 0)
                } else if *take_covered {
                    (7, 0)
                } else {
                    (6, 0)
                }
            }
            Move::InitialPlay { cards } | Move::PlayToOther { cards } => {
                let cost = cards
                    .iter()
                    .map(|c| card_weight(*c, trump))
                    .max()
                    .unwrap_or(0);
                (2, cost)
            }
            Move::PlayFallFromDeck { .. } => (3, 0),
            Move::Skip => (4, 0),
            Move::PlayToSelf { .. } | Move::PlayToSelfFromDeck => (8, 0),
        }
    }
}

impl Agent for BaselineAgent {
    fn decide(&mut self, view: &PlayerView) -> Option<Move> {
        let moves = view.legal_moves();
        moves
            .into_iter()
            .enumerate()
            .min_by_key(|(i, mv)| (Self::priority(mv, view), *i))
            .map(|(_, mv)| mv)
    }
}

/// Picks uniformly among the candidate moves. Reproducible via its
/// seed.
#[derive(Debug)]
pub struct RandomAgent {
    rng: GameRng,
}

impl RandomAgent {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: GameRng::new(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn decide(&mut self, view: &PlayerView) -> Option<Move> {
        let mut moves = view.legal_moves();
        if moves.is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..moves.len());
        Some(moves.swap_remove(pick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;
    use crate::table::testkit;
    use crate::table::view::PlayerView;

    #[test]
    fn test_baseline_initiator_opens_with_cheapest_card() {
        let mut table = testkit::two_player_table();
        let initiator = table.initiator().unwrap();
        let view = PlayerView::from_table(&mut table, initiator);
        let trump = view.trump();

        let mv = BaselineAgent.decide(&view).unwrap();
        let Move::InitialPlay { cards } = &mv else {
            panic!("expected an opening, got {mv}");
        };
        let cheapest = view
            .hand()
            .iter()
            .map(|c| card_weight(*c, trump))
            .min()
            .unwrap();
        let played = cards
            .iter()
            .map(|c| card_weight(*c, trump))
            .max()
            .unwrap();
        assert_eq!(played, cheapest);
    }

    #[test]
    fn test_random_agent_is_reproducible() {
        let mut table = testkit::two_player_table();
        let initiator = table.initiator().unwrap();
        let view = PlayerView::from_table(&mut table, initiator);

        let a = RandomAgent::new(42).decide(&view);
        let b = RandomAgent::new(42).decide(&view);
        assert_eq!(a, b);

        let mv = a.unwrap();
        assert!(table.speculate(initiator, &mv).is_ok());
    }

    #[test]
    fn test_agents_decide_for_every_seat_or_wait() {
        let mut table = testkit::table_with_players(4);
        for player in PlayerId::all(4) {
            let view = PlayerView::from_table(&mut table, player);
            if let Some(mv) = BaselineAgent.decide(&view) {
                assert!(table.speculate(player, &mv).is_ok());
            } else {
                assert!(view.is_target());
            }
        }
    }
}
