//! Exclusive table access with a fairness baton.
//!
//! The table lives inside a [`TableLock`] and is only reachable through
//! [`TableLock::with_lock`] and [`TableLock::with_lock_read`], which
//! run a closure under the mutex. On top of mutual exclusion the lock
//! enforces a baton rule on mutating holds: the unit that held the
//! previous mutating grant is voided if it comes straight back, so no
//! unit can act twice in succession while others are waiting. Read
//! holds are exempt both ways: they are never voided by the baton and
//! never become the previous holder, so a unit can always look at the
//! table it may not yet mutate. A voided or exiting entry returns
//! without running the closure.
//!
//! After every granted closure the lock re-checks the table's card
//! integrity; a violation poisons the game (all later entries see
//! `Exiting`) and surfaces as a fatal error to the caller that broke
//! it.

use std::sync::Mutex;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::FatalError;
use crate::table::Table;

/// Identity of one lock client: a player thread or the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit {}", self.0)
    }
}

/// Outcome of one lock entry.
#[derive(Debug)]
pub enum Entry<R> {
    /// The closure ran; here is its result.
    Granted(R),
    /// The closure did not run: the caller held the previous mutating
    /// grant, or is not registered. Retry after a short backoff.
    Voided,
    /// The closure did not run: the game is shutting down.
    Exiting,
}

impl<R> Entry<R> {
    /// The result, if this entry was granted.
    pub fn granted(self) -> Option<R> {
        match self {
            Entry::Granted(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_exiting(&self) -> bool {
        matches!(self, Entry::Exiting)
    }
}

struct LockState {
    table: Table,
    prev: Option<UnitId>,
    registered: FxHashSet<UnitId>,
    exiting: bool,
}

/// The one gate to the table.
pub struct TableLock {
    inner: Mutex<LockState>,
}

impl TableLock {
    #[must_use]
    pub fn new(table: Table) -> Self {
        Self {
            inner: Mutex::new(LockState {
                table,
                prev: None,
                registered: FxHashSet::default(),
                exiting: false,
            }),
        }
    }

    /// Admit a unit. Only registered units are ever granted the lock.
    pub fn register(&self, unit: UnitId) -> Result<(), FatalError> {
        let mut state = self.lock_state()?;
        state.registered.insert(unit);
        Ok(())
    }

    /// Enter the critical section as `unit` and run `f` on the table
    /// for mutation.
    ///
    /// Blocks until the mutex is free, then applies the baton rule and
    /// the registration check before running anything. An `Err` means
    /// the closure's own mutations broke card integrity; the game is
    /// already marked exiting when it is returned.
    pub fn with_lock<R>(
        &self,
        unit: UnitId,
        f: impl FnOnce(&mut Table) -> R,
    ) -> Result<Entry<R>, FatalError> {
        self.enter(unit, f, true)
    }

    /// Enter the critical section as `unit` for a read-only look at
    /// the table.
    ///
    /// Same registration and exit checks as [`Self::with_lock`], but
    /// exempt from the baton: a read hold is never voided for having
    /// held the previous grant and does not become the previous
    /// holder. The closure must not change any observable state.
    pub fn with_lock_read<R>(
        &self,
        unit: UnitId,
        f: impl FnOnce(&mut Table) -> R,
    ) -> Result<Entry<R>, FatalError> {
        self.enter(unit, f, false)
    }

    fn enter<R>(
        &self,
        unit: UnitId,
        f: impl FnOnce(&mut Table) -> R,
        mutating: bool,
    ) -> Result<Entry<R>, FatalError> {
        let mut state = self.lock_state()?;
        if state.exiting {
            return Ok(Entry::Exiting);
        }
        if !state.registered.contains(&unit) {
            tracing::warn!(unit = %unit, "unregistered unit denied the table");
            return Ok(Entry::Voided);
        }
        if mutating && state.prev == Some(unit) {
            return Ok(Entry::Voided);
        }

        let result = f(&mut state.table);

        if let Err(violation) = state.table.check_integrity() {
            state.exiting = true;
            tracing::error!(unit = %unit, %violation, "integrity violated; game aborted");
            return Err(violation);
        }
        if mutating {
            state.prev = Some(unit);
        }
        Ok(Entry::Granted(result))
    }

    /// Flag the game as shutting down. Exempt from the baton rule and
    /// registration; anyone may pull the plug.
    pub fn request_exit(&self) -> Result<(), FatalError> {
        let mut state = self.lock_state()?;
        state.exiting = true;
        Ok(())
    }

    pub fn is_exiting(&self) -> Result<bool, FatalError> {
        Ok(self.lock_state()?.exiting)
    }

    /// Reclaim the table once every client is done.
    pub fn into_table(self) -> Result<Table, FatalError> {
        self.inner
            .into_inner()
            .map(|state| state.table)
            .map_err(|_| FatalError::LockPoisoned)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, LockState>, FatalError> {
        self.inner.lock().map_err(|_| FatalError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, Suit};
    use crate::table::testkit;

    fn locked() -> TableLock {
        let lock = TableLock::new(testkit::two_player_table());
        lock.register(UnitId(0)).unwrap();
        lock.register(UnitId(1)).unwrap();
        lock
    }

    #[test]
    fn test_unregistered_unit_is_voided() {
        let lock = locked();
        let entry = lock.with_lock(UnitId(99), |_| ()).unwrap();
        assert!(matches!(entry, Entry::Voided));
    }

    #[test]
    fn test_baton_voids_consecutive_entries_by_same_unit() {
        let lock = locked();
        assert!(matches!(
            lock.with_lock(UnitId(0), |_| ()).unwrap(),
            Entry::Granted(())
        ));
        assert!(matches!(
            lock.with_lock(UnitId(0), |_| ()).unwrap(),
            Entry::Voided
        ));
        assert!(matches!(
            lock.with_lock(UnitId(1), |_| ()).unwrap(),
            Entry::Granted(())
        ));
        // 0 may come back now that 1 has held in between.
        assert!(matches!(
            lock.with_lock(UnitId(0), |_| ()).unwrap(),
            Entry::Granted(())
        ));
    }

    #[test]
    fn test_read_holds_leave_the_baton_untouched() {
        let lock = locked();
        assert!(matches!(
            lock.with_lock(UnitId(0), |_| ()).unwrap(),
            Entry::Granted(())
        ));
        // A read is granted straight after the unit's own mutation...
        assert!(matches!(
            lock.with_lock_read(UnitId(0), |_| ()).unwrap(),
            Entry::Granted(())
        ));
        // ...but does not hand the baton back to it,
        assert!(matches!(
            lock.with_lock(UnitId(0), |_| ()).unwrap(),
            Entry::Voided
        ));
        // nor does another unit's read count as the grant in between.
        assert!(matches!(
            lock.with_lock_read(UnitId(1), |_| ()).unwrap(),
            Entry::Granted(())
        ));
        assert!(matches!(
            lock.with_lock(UnitId(0), |_| ()).unwrap(),
            Entry::Voided
        ));
        assert!(matches!(
            lock.with_lock(UnitId(1), |_| ()).unwrap(),
            Entry::Granted(())
        ));
    }

    #[test]
    fn test_exit_flag_short_circuits() {
        let lock = locked();
        lock.request_exit().unwrap();
        assert!(lock.is_exiting().unwrap());
        let entry = lock.with_lock(UnitId(0), |_| ()).unwrap();
        assert!(entry.is_exiting());
    }

    #[test]
    fn test_integrity_violation_is_fatal_and_poisons_the_game() {
        let lock = locked();
        let dup = Card::of(5, Suit::Hearts);
        let err = lock
            .with_lock(UnitId(0), |table| {
                table.push_to_cover_for_test(dup);
                table.push_to_cover_for_test(dup);
            })
            .expect_err("duplicate card must abort");
        assert!(matches!(err, FatalError::DuplicateCard(c) if c == dup));
        assert!(lock.is_exiting().unwrap());
        assert!(lock
            .with_lock(UnitId(1), |_| ())
            .unwrap()
            .is_exiting());
    }

    #[test]
    fn test_tainted_table_aborts_the_game_at_release() {
        let lock = locked();
        let err = lock
            .with_lock(UnitId(0), |table| {
                table.taint_for_test(FatalError::RestoreMismatch("hands".to_string()));
            })
            .expect_err("a tainted table must abort");
        assert!(matches!(err, FatalError::RestoreMismatch(_)));
        assert!(lock.is_exiting().unwrap());
    }

    #[test]
    fn test_into_table_returns_the_table() {
        let lock = locked();
        lock.with_lock(UnitId(0), |_| ()).unwrap();
        let table = lock.into_table().unwrap();
        assert_eq!(table.player_count(), 2);
    }
}
