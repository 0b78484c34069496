//! Snapshot, restore and speculative application.
//!
//! A speculative move runs through the exact committed-move path, then
//! the table is restored from a pre-move snapshot and the restore is
//! verified field by field. Cloning is cheap: every collection on the
//! table is a persistent structure.

use im::Vector;
use thiserror::Error;

use crate::core::{Card, Deck, PlayerId, PlayerMap, PlayerRecord};
use crate::error::FatalError;
use crate::monitor::CardMonitor;
use crate::moves::{AppliedMove, Move, MoveError};

use super::Table;

/// Why a speculation failed.
#[derive(Debug, Error)]
pub enum SpeculateError {
    /// The move itself was illegal. Expected; the table is untouched.
    #[error("illegal move: {0}")]
    Illegal(#[from] MoveError),

    /// Restore verification failed. The table can no longer be
    /// trusted.
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// A full copy of the table's mutable state at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    players: PlayerMap<PlayerRecord>,
    hands: PlayerMap<Vector<Card>>,
    deck: Deck,
    to_cover: Vector<Card>,
    covered: Vector<Card>,
    discard: Vector<Card>,
    trump_card: Card,
    cursor: isize,
    monitor: CardMonitor,
    turn_number: u32,
}

impl Snapshot {
    #[must_use]
    pub fn capture(table: &Table) -> Self {
        Self {
            players: table.players.clone(),
            hands: table.hands.clone(),
            deck: table.deck.clone(),
            to_cover: table.to_cover.clone(),
            covered: table.covered.clone(),
            discard: table.discard.clone(),
            trump_card: table.trump_card,
            cursor: table.cycle.cursor(),
            monitor: table.monitor.clone(),
            turn_number: table.turn_number,
        }
    }

    /// Overwrite the table's mutable state with this snapshot.
    pub fn restore_into(&self, table: &mut Table) {
        table.players = self.players.clone();
        table.hands = self.hands.clone();
        table.deck = self.deck.clone();
        table.to_cover = self.to_cover.clone();
        table.covered = self.covered.clone();
        table.discard = self.discard.clone();
        table.trump_card = self.trump_card;
        table.cycle.set_cursor(self.cursor);
        table.monitor = self.monitor.clone();
        table.turn_number = self.turn_number;
    }

    /// Confirm the table matches this snapshot. The turn cursor and
    /// per-player ready flags are exempt: they are coordination state,
    /// not card state, and a move is allowed to leave them dirty.
    pub fn verify(&self, table: &Table) -> Result<(), FatalError> {
        let mismatch = |field: &str| Err(FatalError::RestoreMismatch(field.to_string()));

        if table.hands != self.hands {
            return mismatch("hands");
        }
        if table.deck != self.deck {
            return mismatch("deck");
        }
        if table.to_cover != self.to_cover {
            return mismatch("to_cover");
        }
        if table.covered != self.covered {
            return mismatch("covered");
        }
        if table.discard != self.discard {
            return mismatch("discard");
        }
        if table.trump_card != self.trump_card {
            return mismatch("trump_card");
        }
        if table.monitor != self.monitor {
            return mismatch("monitor");
        }
        if table.turn_number != self.turn_number {
            return mismatch("turn_number");
        }
        let ranks_match = table
            .players
            .iter()
            .zip(self.players.iter())
            .all(|((_, a), (_, b))| a.name == b.name && a.rank == b.rank);
        if !ranks_match {
            return mismatch("ranks");
        }
        Ok(())
    }
}

/// What a speculative move would do: its effect record and the full
/// state it would leave behind.
#[derive(Clone, Debug, PartialEq)]
pub struct Speculation {
    pub applied: AppliedMove,
    pub state: Snapshot,
}

impl Table {
    /// Try a move without committing it: apply it through the normal
    /// path, capture the resulting state, and put everything back.
    ///
    /// On `Ok` the returned [`Speculation`] carries both the effect
    /// record (including any cards that would be drawn from the current
    /// deck order) and a snapshot of the state the move would produce.
    pub fn speculate(
        &mut self,
        actor: PlayerId,
        mv: &Move,
    ) -> Result<Speculation, SpeculateError> {
        let before = Snapshot::capture(self);
        let result = self.apply_speculative(actor, mv);
        let state = Snapshot::capture(self);
        before.restore_into(self);
        if let Err(violation) = before.verify(self) {
            // The table is no longer trustworthy; taint it so the next
            // lock release aborts the whole game.
            self.taint = Some(violation.clone());
            tracing::error!(%violation, "restore verification failed; table tainted");
            return Err(violation.into());
        }
        let applied = result?;
        Ok(Speculation { applied, state })
    }
}
