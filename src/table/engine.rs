//! Move validation and application.
//!
//! Every move runs the same path whether real or speculative: validate
//! entirely, then mutate. A `MoveError` return is guaranteed to leave
//! the table untouched, so an agent can probe and retry freely. Only a
//! committed (non-speculative) application advances the turn counter,
//! appends to the event log and invokes the evaluator.

use smallvec::SmallVec;

use crate::core::{can_cover, Card, PlayerId};
use crate::moves::{AppliedMove, CoverPair, Move, MoveError};
use crate::telemetry::TurnEvent;

use super::view::PlayerView;
use super::{Table, HAND_SIZE};

/// An opening is one card, or a set in which every rank appears at
/// least twice.
fn opening_is_legal(cards: &[Card]) -> bool {
    if cards.len() == 1 {
        return true;
    }
    cards
        .iter()
        .all(|a| cards.iter().filter(|b| b.rank == a.rank).count() >= 2)
}

impl Table {
    /// Validate and commit a move.
    pub fn apply(&mut self, actor: PlayerId, mv: &Move) -> Result<AppliedMove, MoveError> {
        self.apply_inner(actor, mv, false)
    }

    /// The same path as [`Table::apply`], minus turn counter, event log
    /// and evaluator. Used by speculation.
    pub(crate) fn apply_speculative(
        &mut self,
        actor: PlayerId,
        mv: &Move,
    ) -> Result<AppliedMove, MoveError> {
        self.apply_inner(actor, mv, true)
    }

    fn apply_inner(
        &mut self,
        actor: PlayerId,
        mv: &Move,
        speculative: bool,
    ) -> Result<AppliedMove, MoveError> {
        let applied = match mv {
            Move::InitialPlay { cards } => self.apply_initial_play(actor, cards)?,
            Move::PlayToOther { cards } => self.apply_play_to_other(actor, cards)?,
            Move::PlayToSelf { cards } => self.apply_play_to_self(actor, cards)?,
            Move::PlayToSelfFromDeck => self.apply_to_self_from_deck(actor)?,
            Move::PlayFallFromHand { pairs } => self.apply_fall_from_hand(actor, pairs)?,
            Move::PlayFallFromDeck { covered } => self.apply_fall_from_deck(actor, *covered)?,
            Move::EndTurn { take_covered } => self.apply_end_turn(actor, *take_covered)?,
            Move::Skip => self.apply_skip(actor)?,
        };

        self.monitor.on_move_applied(&applied);

        // Checking protocol: any non-Skip move voids everyone else's
        // readiness, forcing an explicit Skip before the turn may end.
        if !applied.mv.is_skip() {
            for (p, record) in self.players.iter_mut() {
                if p != actor && record.rank.is_none() {
                    record.ready = false;
                }
            }
        }

        // Attackers go out the moment their hand and the deck are both
        // empty; the target is ranked inside EndTurn instead, after the
        // pick-up is settled.
        if matches!(
            applied.mv,
            Move::InitialPlay { .. } | Move::PlayToOther { .. }
        ) {
            self.assign_rank_if_finished(actor);
        }

        if !speculative {
            self.turn_number += 1;
            let evals = self.evaluate_players();
            self.events
                .record(TurnEvent::from_applied(self.turn_number, &applied, evals));
            tracing::debug!(turn = self.turn_number, actor = %actor, mv = %applied.mv, "committed move");
        }
        Ok(applied)
    }

    // === Per-move validate + mutate ===

    fn apply_initial_play(
        &mut self,
        actor: PlayerId,
        cards: &[Card],
    ) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if !self.table_is_empty() {
            return Err(MoveError::TableNotEmpty);
        }
        if cards.is_empty() {
            return Err(MoveError::EmptyPlay);
        }
        if self.initiator() != Some(actor) {
            return Err(MoveError::NotInitiator(actor));
        }
        self.require_in_hand(actor, cards)?;
        if !opening_is_legal(cards) {
            return Err(MoveError::IllegalOpening);
        }
        let capacity = self.hands[self.target()].len();
        if cards.len() > capacity {
            return Err(MoveError::ExceedsTargetHand {
                played: cards.len(),
                capacity,
            });
        }

        self.move_hand_to_table(actor, cards);
        let drawn = self.refill(actor);
        Ok(AppliedMove {
            drawn,
            ..AppliedMove::plain(
                actor,
                Move::InitialPlay {
                    cards: SmallVec::from_slice(cards),
                },
            )
        })
    }

    fn apply_play_to_other(
        &mut self,
        actor: PlayerId,
        cards: &[Card],
    ) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if self.table_is_empty() {
            return Err(MoveError::TableEmpty);
        }
        if actor == self.target() {
            return Err(MoveError::IsTarget(actor));
        }
        if cards.is_empty() {
            return Err(MoveError::EmptyPlay);
        }
        self.require_in_hand(actor, cards)?;
        self.require_ranks_on_table(cards)?;
        let capacity = self.hands[self.target()]
            .len()
            .saturating_sub(self.to_cover.len());
        if cards.len() > capacity {
            return Err(MoveError::ExceedsTargetHand {
                played: cards.len(),
                capacity,
            });
        }

        self.move_hand_to_table(actor, cards);
        let drawn = self.refill(actor);
        Ok(AppliedMove {
            drawn,
            ..AppliedMove::plain(
                actor,
                Move::PlayToOther {
                    cards: SmallVec::from_slice(cards),
                },
            )
        })
    }

    fn apply_play_to_self(
        &mut self,
        actor: PlayerId,
        cards: &[Card],
    ) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if actor != self.target() {
            return Err(MoveError::NotTarget(actor));
        }
        if self.table_is_empty() {
            return Err(MoveError::TableEmpty);
        }
        if cards.is_empty() {
            return Err(MoveError::EmptyPlay);
        }
        self.require_in_hand(actor, cards)?;
        self.require_ranks_on_table(cards)?;

        // The target refills at EndTurn, not here.
        self.move_hand_to_table(actor, cards);
        Ok(AppliedMove::plain(
            actor,
            Move::PlayToSelf {
                cards: SmallVec::from_slice(cards),
            },
        ))
    }

    fn apply_to_self_from_deck(&mut self, actor: PlayerId) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if actor != self.target() {
            return Err(MoveError::NotTarget(actor));
        }
        if self.table_is_empty() {
            return Err(MoveError::TableEmpty);
        }
        let drawn = match self.deck.draw() {
            Some(card) => card.as_kopled(),
            None => return Err(MoveError::DeckEmpty),
        };

        self.to_cover.push_back(drawn);
        let mut applied = AppliedMove::plain(actor, Move::PlayToSelfFromDeck);
        applied.drawn.push(drawn);
        Ok(applied)
    }

    fn apply_fall_from_hand(
        &mut self,
        actor: PlayerId,
        pairs: &[CoverPair],
    ) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if actor != self.target() {
            return Err(MoveError::NotTarget(actor));
        }
        if pairs.is_empty() {
            return Err(MoveError::EmptyPlay);
        }
        for (i, pair) in pairs.iter().enumerate() {
            if pairs[..i].iter().any(|p| p.cover == pair.cover) {
                return Err(MoveError::DuplicatePlay(pair.cover));
            }
            if pairs[..i].iter().any(|p| p.covered == pair.covered) {
                return Err(MoveError::DuplicatePlay(pair.covered));
            }
            if !self.hands[actor].contains(&pair.cover) {
                return Err(MoveError::CardNotInHand(pair.cover));
            }
            if !self.to_cover.contains(&pair.covered) {
                return Err(MoveError::CardNotOnTable(pair.covered));
            }
            if !can_cover(pair.cover, pair.covered, self.trump()) {
                return Err(MoveError::CannotCover {
                    cover: pair.cover,
                    covered: pair.covered,
                });
            }
        }

        for pair in pairs {
            self.remove_from_hand(actor, pair.cover);
            self.remove_from_to_cover(pair.covered);
            self.covered.push_back(pair.covered);
            self.covered.push_back(pair.cover);
        }
        Ok(AppliedMove::plain(
            actor,
            Move::PlayFallFromHand {
                pairs: SmallVec::from_slice(pairs),
            },
        ))
    }

    fn apply_fall_from_deck(
        &mut self,
        actor: PlayerId,
        covered: Card,
    ) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if actor != self.target() {
            return Err(MoveError::NotTarget(actor));
        }
        if self.to_cover.is_empty() {
            return Err(MoveError::TableEmpty);
        }
        if self.deck.is_empty() {
            return Err(MoveError::DeckEmpty);
        }
        if !self.to_cover.contains(&covered) {
            return Err(MoveError::CardNotOnTable(covered));
        }
        let drawn = match self.deck.draw() {
            Some(card) => card.as_kopled(),
            None => return Err(MoveError::DeckEmpty),
        };

        // The drawn card was committed by the draw: it either covers
        // the nominated card or joins the cards to cover.
        let kople_covered = can_cover(drawn, covered, self.trump());
        if kople_covered {
            self.remove_from_to_cover(covered);
            self.covered.push_back(covered);
            self.covered.push_back(drawn);
        } else {
            self.to_cover.push_back(drawn);
        }

        let mut applied = AppliedMove::plain(actor, Move::PlayFallFromDeck { covered });
        applied.drawn.push(drawn);
        applied.kople_covered = kople_covered;
        Ok(applied)
    }

    fn apply_end_turn(
        &mut self,
        actor: PlayerId,
        take_covered: bool,
    ) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if actor != self.target() {
            return Err(MoveError::NotTarget(actor));
        }
        let all_ready = self
            .players
            .iter()
            .all(|(p, r)| p == actor || r.rank.is_some() || r.ready);
        if !all_ready {
            return Err(MoveError::OpponentsNotReady);
        }

        let lifted = !self.to_cover.is_empty();
        let mut picked_up: SmallVec<[Card; 8]> = SmallVec::new();
        if lifted {
            picked_up.extend(self.to_cover.iter().copied());
            if take_covered {
                picked_up.extend(self.covered.iter().copied());
            } else {
                self.discard.append(self.covered.clone());
            }
        } else {
            // A clean defence: everything covered leaves play.
            self.discard.append(self.covered.clone());
        }
        self.to_cover.clear();
        self.covered.clear();
        for card in &picked_up {
            let mut card = *card;
            card.kopled = false;
            self.hands[actor].push_back(card);
        }
        let drawn = self.refill(actor);

        // Rank the departing target before rotating, so the scan below
        // already steps over them.
        self.assign_rank_if_finished(actor);

        let players = &self.players;
        self.cycle.scan_forward(|p| players[p].rank.is_none(), true);
        if lifted {
            // A target who picked up is skipped as the next initiator.
            let players = &self.players;
            self.cycle.scan_forward(|p| players[p].rank.is_none(), true);
        }

        Ok(AppliedMove {
            drawn,
            picked_up,
            ..AppliedMove::plain(actor, Move::EndTurn { take_covered })
        })
    }

    fn apply_skip(&mut self, actor: PlayerId) -> Result<AppliedMove, MoveError> {
        self.require_unfinished(actor)?;
        if actor == self.target() {
            return Err(MoveError::IsTarget(actor));
        }
        self.players[actor].ready = true;
        Ok(AppliedMove::plain(actor, Move::Skip))
    }

    // === Shared validation ===

    fn require_unfinished(&self, actor: PlayerId) -> Result<(), MoveError> {
        if self.players[actor].rank.is_some() {
            return Err(MoveError::AlreadyFinished(actor));
        }
        Ok(())
    }

    fn require_in_hand(&self, actor: PlayerId, cards: &[Card]) -> Result<(), MoveError> {
        for (i, card) in cards.iter().enumerate() {
            if cards[..i].contains(card) {
                return Err(MoveError::DuplicatePlay(*card));
            }
            if !self.hands[actor].contains(card) {
                return Err(MoveError::CardNotInHand(*card));
            }
        }
        Ok(())
    }

    fn require_ranks_on_table(&self, cards: &[Card]) -> Result<(), MoveError> {
        let ranks = self.table_ranks();
        for card in cards {
            if !ranks.contains(&card.rank) {
                return Err(MoveError::RankNotOnTable(card.rank));
            }
        }
        Ok(())
    }

    // === Shared mutation ===

    fn move_hand_to_table(&mut self, actor: PlayerId, cards: &[Card]) {
        for card in cards {
            self.remove_from_hand(actor, *card);
            self.to_cover.push_back(*card);
        }
    }

    fn remove_from_hand(&mut self, player: PlayerId, card: Card) {
        let pos = self.hands[player]
            .iter()
            .position(|&c| c == card)
            .expect("presence validated before mutation");
        self.hands[player].remove(pos);
    }

    fn remove_from_to_cover(&mut self, card: Card) {
        let pos = self
            .to_cover
            .iter()
            .position(|&c| c == card)
            .expect("presence validated before mutation");
        self.to_cover.remove(pos);
    }

    fn refill(&mut self, player: PlayerId) -> SmallVec<[Card; 8]> {
        let missing = HAND_SIZE.saturating_sub(self.hands[player].len());
        let drawn = self.deck.draw_up_to(missing);
        for card in &drawn {
            self.hands[player].push_back(*card);
        }
        drawn
    }

    fn assign_rank_if_finished(&mut self, player: PlayerId) {
        if self.players[player].rank.is_none()
            && self.hands[player].is_empty()
            && self.deck.is_empty()
        {
            let rank = self.next_rank();
            self.players[player].rank = Some(rank);
            tracing::info!(player = %player, rank, "player finished");
        }
    }

    fn evaluate_players(&mut self) -> Option<Vec<f32>> {
        if self.evaluator.is_none() {
            return None;
        }
        let vectors: Vec<Vec<f32>> = PlayerId::all(self.player_count())
            .map(|p| PlayerView::from_table(self, p).as_vector())
            .collect();
        let evaluator = self.evaluator.as_ref()?;
        Some(vectors.iter().map(|v| evaluator.evaluate(v)).collect())
    }
}
