//! The game coordinator: one thread per player, one shared table.
//!
//! `run` deals a table, wraps it in a [`TableLock`], spawns a thread
//! per (name, agent) pair and then polls for completion. Player threads
//! work in two lock holds per move: clone a [`PlayerView`] under a read
//! hold, decide on the copy outside any critical section, submit under
//! a mutating hold. The baton rule in the lock keeps one fast thread
//! from committing twice in a row (read holds are exempt, so a thread
//! can always refresh its view); a voided entry backs off with seeded
//! jitter and retries.
//!
//! The coordinator registers itself as a lock unit and takes periodic
//! maintenance holds. Those holds rank the last player once the game is
//! down to one, and keep the baton moving when only a single player
//! thread is still alive.

pub mod agent;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::{Deck, GameRng, PlayerId};
use crate::error::{FailureReason, FatalError, ProtocolError};
use crate::eval::Evaluator;
use crate::sync::{Entry, TableLock, UnitId};
use crate::table::view::PlayerView;
use crate::table::Table;

use agent::Agent;

/// How often the coordinator polls for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Consecutive rejected submissions before a player is declared broken.
const MAX_ILLEGAL_STREAK: u32 = 100;

/// Everything needed to start a game.
pub struct GameOptions {
    pub names: Vec<String>,
    pub seed: u64,
    pub timeout: Duration,
    /// Deal from this deck instead of a freshly shuffled one.
    pub deck: Option<Deck>,
    pub full_visibility: bool,
    pub evaluator: Option<Box<dyn Evaluator + Send>>,
}

impl GameOptions {
    #[must_use]
    pub fn new(names: Vec<String>, seed: u64) -> Self {
        Self {
            names,
            seed,
            timeout: Duration::from_secs(60),
            deck: None,
            full_visibility: false,
            evaluator: None,
        }
    }
}

/// How a game ended.
#[derive(Debug)]
pub enum GameOutcome {
    /// Every player ranked; rankings sorted ascending (1 = first out).
    Finished { rankings: Vec<(String, u32)> },
    /// The game was aborted; no ranking exists.
    Failed { reason: FailureReason },
}

impl GameOutcome {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, GameOutcome::Finished { .. })
    }
}

/// The outcome plus the final table (event log included). The table is
/// absent only when a player thread panicked while holding the lock.
pub struct GameReport {
    pub outcome: GameOutcome,
    pub table: Option<Table>,
}

/// Play one game to completion (or failure) and return the report.
pub fn run(
    options: GameOptions,
    agents: Vec<Box<dyn Agent>>,
) -> Result<GameReport, ProtocolError> {
    if agents.len() != options.names.len() {
        return Err(ProtocolError::BadPlayerCount(agents.len()));
    }

    let mut rng = GameRng::new(options.seed);
    let deck = match options.deck {
        Some(deck) => deck,
        None => Deck::standard(&mut rng),
    };
    let mut table = Table::deal(&options.names, deck)?;
    table.set_full_visibility(options.full_visibility);
    if let Some(evaluator) = options.evaluator {
        table.set_evaluator(evaluator);
    }

    let player_count = options.names.len();
    let lock = Arc::new(TableLock::new(table));
    let coordinator = UnitId(player_count as u32);
    let failure: Arc<Mutex<Option<FailureReason>>> = Arc::new(Mutex::new(None));

    for i in 0..=player_count {
        if lock.register(UnitId(i as u32)).is_err() {
            return Ok(failed_report(FatalError::LockPoisoned.into(), None));
        }
    }

    let mut handles = Vec::with_capacity(player_count);
    for (i, mut agent) in agents.into_iter().enumerate() {
        let lock = Arc::clone(&lock);
        let failure = Arc::clone(&failure);
        let name = options.names[i].clone();
        let mut thread_rng = rng.fork();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let player = PlayerId::new(i as u8);
                let unit = UnitId(i as u32);
                if let Err(reason) =
                    player_loop(&lock, unit, player, &name, agent.as_mut(), &mut thread_rng)
                {
                    record_failure(&failure, reason);
                    let _ = lock.request_exit();
                }
            })
            .map_err(|e| ProtocolError::ThreadSpawn(e.to_string()))?;
        handles.push(handle);
    }

    // Join loop: poll the threads, take maintenance holds, enforce the
    // deadline.
    let started = Instant::now();
    let mut timed_out = false;
    loop {
        if handles.iter().all(thread::JoinHandle::is_finished) {
            break;
        }
        if !timed_out && started.elapsed() > options.timeout {
            timed_out = true;
            tracing::warn!(timeout_ms = options.timeout.as_millis() as u64, "game deadline hit");
            let _ = lock.request_exit();
        }
        match lock.with_lock(coordinator, |table| table.finalize_if_over()) {
            Ok(Entry::Granted(true)) => {
                let _ = lock.request_exit();
            }
            Ok(_) => {}
            Err(fatal) => record_failure(&failure, fatal.into()),
        }
        thread::sleep(POLL_INTERVAL);
    }

    for handle in handles {
        let name = handle.thread().name().unwrap_or("?").to_string();
        if handle.join().is_err() {
            record_failure(
                &failure,
                FailureReason::PlayerFailed {
                    name,
                    detail: "player thread panicked".to_string(),
                },
            );
        }
    }

    let table = Arc::try_unwrap(lock)
        .ok()
        .and_then(|lock| lock.into_table().ok());

    let failure = failure.lock().ok().and_then(|mut slot| slot.take());
    let outcome = if let Some(reason) = failure {
        GameOutcome::Failed { reason }
    } else if timed_out {
        GameOutcome::Failed {
            reason: FailureReason::TimedOut {
                timeout_ms: options.timeout.as_millis() as u64,
            },
        }
    } else if let Some(rankings) = table.as_ref().and_then(Table::ranking) {
        GameOutcome::Finished { rankings }
    } else {
        GameOutcome::Failed {
            reason: FatalError::LockPoisoned.into(),
        }
    };
    Ok(GameReport { outcome, table })
}

fn failed_report(reason: FailureReason, table: Option<Table>) -> GameReport {
    GameReport {
        outcome: GameOutcome::Failed { reason },
        table,
    }
}

fn record_failure(slot: &Mutex<Option<FailureReason>>, reason: FailureReason) {
    if let Ok(mut guard) = slot.lock() {
        guard.get_or_insert(reason);
    }
}

/// One player's life: view, decide, submit, until ranked or told to
/// exit.
fn player_loop(
    lock: &TableLock,
    unit: UnitId,
    player: PlayerId,
    name: &str,
    agent: &mut dyn Agent,
    rng: &mut GameRng,
) -> Result<(), FailureReason> {
    let mut illegal_streak = 0u32;
    loop {
        let entry = lock
            .with_lock_read(unit, |table| {
                if table.players()[player].rank.is_some() || table.is_over() {
                    None
                } else {
                    Some(PlayerView::from_table(table, player))
                }
            })
            .map_err(FailureReason::from)?;
        let view = match entry {
            Entry::Exiting => return Ok(()),
            Entry::Voided => {
                back_off(rng);
                continue;
            }
            Entry::Granted(None) => return Ok(()),
            Entry::Granted(Some(view)) => view,
        };

        // Think on the copy, outside the lock.
        let Some(mv) = agent.decide(&view) else {
            back_off(rng);
            continue;
        };

        let entry = lock
            .with_lock(unit, |table| table.apply(player, &mv))
            .map_err(FailureReason::from)?;
        match entry {
            Entry::Exiting => return Ok(()),
            Entry::Voided => back_off(rng),
            Entry::Granted(Ok(applied)) => {
                illegal_streak = 0;
                tracing::trace!(player = %player, mv = %applied.mv, "move accepted");
            }
            Entry::Granted(Err(rejected)) => {
                // The table moved between our two holds; refresh and
                // retry. A long streak means the agent is broken.
                illegal_streak += 1;
                tracing::debug!(player = %player, %rejected, "move rejected, view was stale");
                if illegal_streak > MAX_ILLEGAL_STREAK {
                    return Err(FailureReason::PlayerFailed {
                        name: name.to_string(),
                        detail: format!("{MAX_ILLEGAL_STREAK} rejected moves in a row: {rejected}"),
                    });
                }
                back_off(rng);
            }
        }
    }
}

fn back_off(rng: &mut GameRng) {
    thread::sleep(Duration::from_millis(rng.jitter_ms()));
}
