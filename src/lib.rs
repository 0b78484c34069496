//! A multithreaded engine for Moska, a Finnish trick-taking card game.
//!
//! Each player runs on its own thread; the shared [`table::Table`] is
//! only reachable through [`sync::TableLock`], whose baton rule keeps
//! any one unit from acting twice in succession. Moves go through a
//! validate-or-reject engine ([`table::engine`]) so an illegal
//! submission never mutates anything, and the same path powers
//! speculative what-if application ([`Table::speculate`]).
//!
//! The quickest way in is [`game::run`]:
//!
//! ```
//! use moska_engine::game::{self, agent::BaselineAgent, GameOptions};
//!
//! let names = vec!["south".to_string(), "north".to_string()];
//! let agents: Vec<Box<dyn game::agent::Agent>> =
//!     vec![Box::new(BaselineAgent), Box::new(BaselineAgent)];
//! let report = game::run(GameOptions::new(names, 7), agents).unwrap();
//! assert!(report.outcome.is_finished());
//! ```

pub mod core;
pub mod cycle;
pub mod error;
pub mod eval;
pub mod game;
pub mod monitor;
pub mod moves;
pub mod sync;
pub mod table;
pub mod telemetry;

pub use crate::core::{can_cover, Card, Deck, GameRng, PlayerId, Rank, Suit};
pub use crate::cycle::TurnCycle;
pub use crate::error::{FailureReason, FatalError, ProtocolError};
pub use crate::game::{GameOptions, GameOutcome, GameReport};
pub use crate::moves::{AppliedMove, CoverPair, Move, MoveError};
pub use crate::sync::{Entry, TableLock, UnitId};
pub use crate::table::{Table, HAND_SIZE};
