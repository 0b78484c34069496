//! Circular turn order over the seated players.
//!
//! A `TurnCycle` owns an ordered population of `PlayerId`s and a single
//! cursor. The population may grow during a game but never shrinks;
//! finished players stay in the cycle and are stepped over by the
//! conditional scans. The element at the cursor is the current target.
//!
//! The two scans are deliberately asymmetric, matching the call sites
//! that depend on them: a backward scan examines the element *at* the
//! cursor first and leaves the cursor alone by default, while a forward
//! scan starts one past the cursor and is normally asked to advance.
//! A scan that probes the whole population without a hit reports `None`
//! — never an empty-collection stand-in.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::PlayerId;

/// Cycle access error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CycleError {
    #[error("turn cycle has an empty population")]
    EmptyPopulation,
}

/// An ordered, growable ring of players with a cursor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCycle {
    population: Vec<PlayerId>,
    cursor: isize,
}

impl TurnCycle {
    /// Create a cycle over the given players with the cursor at 0.
    #[must_use]
    pub fn new(population: Vec<PlayerId>) -> Self {
        Self {
            population,
            cursor: 0,
        }
    }

    /// Number of seated players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.population.len()
    }

    /// Whether the population is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// The raw (un-modded) cursor value.
    #[must_use]
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// Set the cursor to an arbitrary value; reads mod it into range.
    pub fn set_cursor(&mut self, cursor: isize) {
        self.cursor = cursor;
    }

    fn element(&self, index: isize) -> Result<PlayerId, CycleError> {
        let n = self.population.len();
        if n == 0 {
            return Err(CycleError::EmptyPopulation);
        }
        Ok(self.population[index.rem_euclid(n as isize) as usize])
    }

    /// The player at `index` mod the population size.
    pub fn at(&self, index: isize) -> Result<PlayerId, CycleError> {
        self.element(index)
    }

    /// The player at the cursor: the current target.
    pub fn current(&self) -> Result<PlayerId, CycleError> {
        self.element(self.cursor)
    }

    /// The element at cursor+1, advancing the cursor when asked.
    pub fn next(&mut self, advance: bool) -> Result<PlayerId, CycleError> {
        let out = self.element(self.cursor + 1)?;
        if advance {
            self.cursor += 1;
        }
        Ok(out)
    }

    /// The element at cursor-1, moving the cursor back when asked.
    pub fn previous(&mut self, advance: bool) -> Result<PlayerId, CycleError> {
        let out = self.element(self.cursor - 1)?;
        if advance {
            self.cursor -= 1;
        }
        Ok(out)
    }

    /// Walk backward from the element at the cursor, returning the first
    /// player matching `predicate`, or `None` after a full lap.
    ///
    /// The cursor is restored unless `advance` is set, in which case it
    /// stays on the match.
    pub fn scan_backward(
        &mut self,
        predicate: impl Fn(PlayerId) -> bool,
        advance: bool,
    ) -> Option<PlayerId> {
        if self.population.is_empty() {
            return None;
        }
        let saved = self.cursor;
        // The backward scan considers the current element first.
        let mut candidate = self.element(self.cursor).ok()?;
        let mut probes = 1;
        while !predicate(candidate) {
            if probes == self.population.len() {
                self.cursor = saved;
                return None;
            }
            self.cursor -= 1;
            candidate = self.element(self.cursor).ok()?;
            probes += 1;
        }
        if !advance {
            self.cursor = saved;
        }
        Some(candidate)
    }

    /// Walk forward from the element after the cursor, returning the
    /// first player matching `predicate`, or `None` after a full lap.
    ///
    /// The cursor is restored unless `advance` is set. Call sites that
    /// rotate the target pass `advance = true`.
    pub fn scan_forward(
        &mut self,
        predicate: impl Fn(PlayerId) -> bool,
        advance: bool,
    ) -> Option<PlayerId> {
        if self.population.is_empty() {
            return None;
        }
        let saved = self.cursor;
        // The forward scan starts one past the current element.
        self.cursor += 1;
        let mut candidate = self.element(self.cursor).ok()?;
        let mut probes = 1;
        while !predicate(candidate) {
            if probes == self.population.len() {
                self.cursor = saved;
                return None;
            }
            self.cursor += 1;
            candidate = self.element(self.cursor).ok()?;
            probes += 1;
        }
        if !advance {
            self.cursor = saved;
        }
        Some(candidate)
    }

    /// Append a player; the cursor stays put unless redirected.
    pub fn push(&mut self, player: PlayerId, move_cursor_to: Option<isize>) {
        self.population.push(player);
        if let Some(cursor) = move_cursor_to {
            self.cursor = cursor;
        }
    }
}
