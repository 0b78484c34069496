//! Per-move telemetry.
//!
//! Every committed move appends one [`TurnEvent`] to the table's
//! [`EventLog`]. The log is append-only and serializable, so a finished
//! game can be dumped wholesale for replay or analysis.

use serde::{Deserialize, Serialize};

use crate::core::{Card, PlayerId};
use crate::moves::{AppliedMove, Move};

/// One committed move, with its side effects and optional evaluation
/// scores (one per seat, in seat order).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub turn: u32,
    pub actor: PlayerId,
    pub mv: Move,
    pub drawn: Vec<Card>,
    pub picked_up: Vec<Card>,
    pub kople_covered: bool,
    pub evals: Option<Vec<f32>>,
}

impl TurnEvent {
    pub fn from_applied(turn: u32, applied: &AppliedMove, evals: Option<Vec<f32>>) -> Self {
        Self {
            turn,
            actor: applied.actor,
            mv: applied.mv.clone(),
            drawn: applied.drawn.to_vec(),
            picked_up: applied.picked_up.to_vec(),
            kople_covered: applied.kople_covered,
            evals,
        }
    }
}

/// Append-only log of committed moves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<TurnEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TurnEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TurnEvent> {
        self.events.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TurnEvent> {
        self.events.iter()
    }

    /// Serialize the whole log as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.events)
    }
}
