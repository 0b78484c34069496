//! The closed set of move kinds and their argument types.
//!
//! A move is data only: the deciding agent builds one outside the lock
//! and submits it to `Table::apply` inside the critical section. Each
//! variant carries its own typed arguments; there is no string-keyed
//! dispatch. Application either commits and returns an `AppliedMove`
//! describing exactly which cards changed location, or rejects with a
//! `MoveError` and leaves shared state untouched.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::core::{Card, PlayerId, Rank};

/// A (covering, covered) pair for falling table cards from hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverPair {
    /// The card played from the actor's hand.
    pub cover: Card,
    /// The table card it neutralizes.
    pub covered: Card,
}

/// One of the eight move kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Open the turn by playing cards to an empty table.
    InitialPlay { cards: SmallVec<[Card; 4]> },

    /// Play additional cards for the target to cover; the ranks must
    /// already be on the table.
    PlayToOther { cards: SmallVec<[Card; 4]> },

    /// The target plays rank-matching cards from hand onto itself.
    PlayToSelf { cards: SmallVec<[Card; 4]> },

    /// The target draws the top deck card blind onto the table.
    PlayToSelfFromDeck,

    /// Cover table cards with cards from hand.
    PlayFallFromHand { pairs: SmallVec<[CoverPair; 4]> },

    /// Draw the top deck card and try to cover the nominated table
    /// card with it; a miss leaves the drawn card on the table.
    PlayFallFromDeck { covered: Card },

    /// Close the turn: pick up the outstanding table cards (optionally
    /// the covered ones too) and rotate the target.
    EndTurn { take_covered: bool },

    /// Signal readiness without touching any cards.
    Skip,
}

impl Move {
    /// Short name for logs and telemetry.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Move::InitialPlay { .. } => "InitialPlay",
            Move::PlayToOther { .. } => "PlayToOther",
            Move::PlayToSelf { .. } => "PlayToSelf",
            Move::PlayToSelfFromDeck => "PlayToSelfFromDeck",
            Move::PlayFallFromHand { .. } => "PlayFallFromHand",
            Move::PlayFallFromDeck { .. } => "PlayFallFromDeck",
            Move::EndTurn { .. } => "EndTurn",
            Move::Skip => "Skip",
        }
    }

    /// Whether this is the readiness-only move.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Move::Skip)
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rejection of an illegal move. Expected and frequent; shared state is
/// unchanged when one of these is returned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no cards were played")]
    EmptyPlay,

    #[error("the table already has cards on it")]
    TableNotEmpty,

    #[error("the table is empty")]
    TableEmpty,

    #[error("the deck is empty")]
    DeckEmpty,

    #[error("{0} has already finished")]
    AlreadyFinished(PlayerId),

    #[error("{0} is not the initiating player")]
    NotInitiator(PlayerId),

    #[error("{0} is not the target")]
    NotTarget(PlayerId),

    #[error("{0} is the target and cannot make this move")]
    IsTarget(PlayerId),

    #[error("card {0} is not in the player's hand")]
    CardNotInHand(Card),

    #[error("card {0} is not on the table awaiting cover")]
    CardNotOnTable(Card),

    #[error("rank {0} is not on the table")]
    RankNotOnTable(Rank),

    #[error("opening combination is illegal: every rank must appear at least twice")]
    IllegalOpening,

    #[error("play of {played} cards exceeds the target's capacity of {capacity}")]
    ExceedsTargetHand { played: usize, capacity: usize },

    #[error("{cover} cannot cover {covered}")]
    CannotCover { cover: Card, covered: Card },

    #[error("card {0} is used more than once in this move")]
    DuplicatePlay(Card),

    #[error("opponents are not all ready; the turn cannot end yet")]
    OpponentsNotReady,
}

/// The committed effect of a successful move.
///
/// Records every card the move touched, so the card monitor and the
/// telemetry log can be updated in O(cards touched) without rescanning
/// the full state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMove {
    /// Who made the move.
    pub actor: PlayerId,

    /// The move as submitted.
    pub mv: Move,

    /// Cards that entered the actor's hand from the deck (refills) or,
    /// for the deck-play moves, the single card drawn onto the table.
    pub drawn: SmallVec<[Card; 8]>,

    /// Cards the target lifted from the table on `EndTurn`.
    pub picked_up: SmallVec<[Card; 8]>,

    /// For `PlayFallFromDeck`: whether the drawn card covered the
    /// nominated card (a miss leaves it on the table).
    pub kople_covered: bool,
}

impl AppliedMove {
    /// A committed move that drew and lifted nothing.
    #[must_use]
    pub fn plain(actor: PlayerId, mv: Move) -> Self {
        Self {
            actor,
            mv,
            drawn: SmallVec::new(),
            picked_up: SmallVec::new(),
            kople_covered: false,
        }
    }
}
