//! Fatal and setup error taxonomy.
//!
//! Illegal moves are *not* errors in this sense — they are the expected,
//! frequent rejections carried by `moves::MoveError`. The types here are
//! the terminal conditions: integration mistakes caught at setup, and
//! must-not-happen invariant violations that abort the whole game.

use thiserror::Error;

use crate::core::Card;

/// Programmer/integration error detected at setup. Fatal at the point
/// of detection: the game never starts.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("player name {0:?} is not unique")]
    DuplicateName(String),

    #[error("unsupported player count {0}: must be 2..=8")]
    BadPlayerCount(usize),

    #[error("deck of {got} cards is too small: dealing needs {required} (hands plus the trump)")]
    DeckTooSmall { required: usize, got: usize },

    #[error("could not spawn a player thread: {0}")]
    ThreadSpawn(String),
}

/// A must-not-happen internal condition. Flips the game to `Failed`,
/// terminates every unit, and is never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("duplicate card {0} among the cards to cover")]
    DuplicateCard(Card),

    #[error("live state differs from its snapshot after a restore: {0}")]
    RestoreMismatch(String),

    #[error("the table lock was poisoned by a panicking unit")]
    LockPoisoned,
}

/// Why a game run ended without a ranking.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error(transparent)]
    Fatal(#[from] FatalError),

    #[error("game timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },

    #[error("player {name} failed: {detail}")]
    PlayerFailed { name: String, detail: String },
}
