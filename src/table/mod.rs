//! The shared game table: the one mutable resource of a game.
//!
//! `Table` aggregates everything a move can touch — hands, the draw
//! pile, the two table piles, the discard, the trump card, per-player
//! rank/ready bookkeeping, the turn cycle, the card monitor and the
//! event log. It is only ever reachable through `sync::TableLock`, so
//! all mutation happens inside a critical section by construction.
//!
//! The move engine lives in [`engine`], snapshot/speculation in
//! [`snapshot`], and perspective-limited read views in [`view`].

pub mod engine;
pub mod snapshot;
pub mod view;

use im::Vector;

use crate::core::{Card, Deck, PlayerId, PlayerMap, PlayerRecord, Rank, Suit};
use crate::cycle::TurnCycle;
use crate::error::{FatalError, ProtocolError};
use crate::eval::Evaluator;
use crate::monitor::CardMonitor;
use crate::telemetry::EventLog;

/// Hands are refilled from the deck up to this size while cards last.
pub const HAND_SIZE: usize = 6;

/// The rank of the "escape" card swapped for the drawn trump at setup.
const TRUMP_SWAP_RANK: Rank = Rank(2);

/// The complete mutable state of one running game.
pub struct Table {
    players: PlayerMap<PlayerRecord>,
    hands: PlayerMap<Vector<Card>>,
    deck: Deck,
    to_cover: Vector<Card>,
    covered: Vector<Card>,
    discard: Vector<Card>,
    trump_card: Card,
    cycle: TurnCycle,
    monitor: CardMonitor,
    events: EventLog,
    turn_number: u32,
    evaluator: Option<Box<dyn Evaluator + Send>>,
    full_visibility: bool,
    /// Set when a snapshot restore failed verification. The table can
    /// no longer be trusted; `check_integrity` reports it until the
    /// game is torn down.
    taint: Option<FatalError>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("players", &self.players)
            .field("deck_len", &self.deck.len())
            .field("to_cover", &self.to_cover)
            .field("covered", &self.covered)
            .field("trump_card", &self.trump_card)
            .field("turn_number", &self.turn_number)
            .finish_non_exhaustive()
    }
}

impl Table {
    /// Deal a new table: six cards to each named player from the given
    /// deck, then assign trump from the next card, swapping it for a
    /// player-held trump two if there is one.
    pub fn deal(names: &[String], mut deck: Deck) -> Result<Self, ProtocolError> {
        if !(2..=8).contains(&names.len()) {
            return Err(ProtocolError::BadPlayerCount(names.len()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ProtocolError::DuplicateName(name.clone()));
            }
        }
        // Every hand plus the trump card must come off the deck.
        let required = names.len() * HAND_SIZE + 1;
        if deck.len() < required {
            return Err(ProtocolError::DeckTooSmall {
                required,
                got: deck.len(),
            });
        }

        let player_count = names.len();
        let players = PlayerMap::new(player_count, |p| PlayerRecord::new(names[p.index()].clone()));

        let mut hands: PlayerMap<Vector<Card>> = PlayerMap::with_default(player_count);
        for player in PlayerId::all(player_count) {
            hands[player] = deck.draw_up_to(HAND_SIZE).into_iter().collect();
        }

        let mut monitor = CardMonitor::new(player_count);
        monitor.start(&hands);

        let mut table = Self {
            players,
            hands,
            deck,
            to_cover: Vector::new(),
            covered: Vector::new(),
            discard: Vector::new(),
            trump_card: Card::of(2, Suit::Clubs), // placeholder until assigned below
            cycle: TurnCycle::new(PlayerId::all(player_count).collect()),
            monitor,
            events: EventLog::new(),
            turn_number: 0,
            evaluator: None,
            full_visibility: false,
            taint: None,
        };
        table.assign_trump();
        Ok(table)
    }

    /// Draw the trump card and relocate it to the deck bottom, swapping
    /// it into the hand of a player holding the trump two.
    fn assign_trump(&mut self) {
        let drawn = self
            .deck
            .draw()
            .expect("deal checked the deck covers all hands plus the trump");
        let trump = drawn.suit;
        let escape = Card::new(TRUMP_SWAP_RANK, trump);

        let holder = PlayerId::all(self.player_count())
            .find(|&p| self.hands[p].contains(&escape));

        let bottom_card = match holder {
            Some(player) => {
                let pos = self.hands[player]
                    .iter()
                    .position(|&c| c == escape)
                    .expect("holder was found by the same membership test");
                self.hands[player].remove(pos);
                self.hands[player].push_back(drawn);
                self.monitor.swap_trump(player, escape, drawn);
                tracing::info!(player = %player, taken = %escape, given = %drawn, "swapped trump card");
                escape
            }
            None => drawn,
        };

        self.trump_card = bottom_card;
        self.deck.place_bottom(bottom_card);
        tracing::info!(trump = %bottom_card, "trump assigned and placed at deck bottom");
    }

    /// Attach a per-move evaluator (instrumentation only).
    pub fn set_evaluator(&mut self, evaluator: Box<dyn Evaluator + Send>) {
        self.evaluator = Some(evaluator);
    }

    /// Grant every view full hand visibility (testing mode).
    pub fn set_full_visibility(&mut self, full: bool) {
        self.full_visibility = full;
    }

    // === Queries ===

    /// Number of seats.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.player_count()
    }

    /// Per-player records (name, rank, ready).
    #[must_use]
    pub fn players(&self) -> &PlayerMap<PlayerRecord> {
        &self.players
    }

    /// A player's hand.
    #[must_use]
    pub fn hand(&self, player: PlayerId) -> &Vector<Card> {
        &self.hands[player]
    }

    /// The draw pile.
    #[must_use]
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Cards on the table awaiting a cover.
    #[must_use]
    pub fn to_cover(&self) -> &Vector<Card> {
        &self.to_cover
    }

    /// Cards covered this turn, covers included.
    #[must_use]
    pub fn covered(&self) -> &Vector<Card> {
        &self.covered
    }

    /// Cards out of play.
    #[must_use]
    pub fn discard(&self) -> &Vector<Card> {
        &self.discard
    }

    /// The trump card at the deck bottom (or already drawn from it).
    #[must_use]
    pub fn trump_card(&self) -> Card {
        self.trump_card
    }

    /// The trump suit.
    #[must_use]
    pub fn trump(&self) -> Suit {
        self.trump_card.suit
    }

    /// The card monitor's read-only truth.
    #[must_use]
    pub fn monitor(&self) -> &CardMonitor {
        &self.monitor
    }

    /// The append-only event log.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Number of committed moves so far.
    #[must_use]
    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// The turn cycle (cursor = current target).
    #[must_use]
    pub fn cycle(&self) -> &TurnCycle {
        &self.cycle
    }

    /// The player cards are currently played to.
    #[must_use]
    pub fn target(&self) -> PlayerId {
        self.cycle
            .current()
            .expect("a dealt table always has a population")
    }

    /// The player whose turn it is to open play to an empty table:
    /// the nearest previous active player other than the target. When a
    /// player has just finished, the target can briefly be its own
    /// initiator.
    #[must_use]
    pub fn initiator(&mut self) -> Option<PlayerId> {
        let target = self.target();
        let players = &self.players;
        let hit = self
            .cycle
            .scan_backward(|p| players[p].rank.is_none() && p != target, false);
        match hit {
            Some(p) => Some(p),
            None => self
                .cycle
                .scan_backward(|p| players[p].rank.is_none(), false),
        }
    }

    /// Players still in the game.
    #[must_use]
    pub fn active_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|(_, r)| r.is_active())
            .map(|(p, _)| p)
            .collect()
    }

    /// Whether the terminal condition holds: at most one player left
    /// un-ranked.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.active_players().len() <= 1
    }

    /// Ranks present on the table (both piles).
    #[must_use]
    pub fn table_ranks(&self) -> Vec<Rank> {
        let mut ranks: Vec<Rank> = self
            .to_cover
            .iter()
            .chain(self.covered.iter())
            .map(|c| c.rank)
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        ranks
    }

    /// Whether the table (both piles) is empty.
    #[must_use]
    pub fn table_is_empty(&self) -> bool {
        self.to_cover.is_empty() && self.covered.is_empty()
    }

    /// Assign the terminal rank to the last remaining player, if the
    /// game is down to one. Returns true once the game is over.
    pub fn finalize_if_over(&mut self) -> bool {
        let active = self.active_players();
        if active.len() > 1 {
            return false;
        }
        if let [last] = active[..] {
            let rank = self.next_rank();
            self.players[last].rank = Some(rank);
            tracing::info!(player = %last, rank, "last player ranked; game over");
        }
        true
    }

    /// Final ranking: (name, rank) sorted ascending. `None` if any
    /// player is still un-ranked.
    #[must_use]
    pub fn ranking(&self) -> Option<Vec<(String, u32)>> {
        let mut out = Vec::with_capacity(self.player_count());
        for (_, record) in self.players.iter() {
            out.push((record.name.clone(), record.rank?));
        }
        out.sort_by_key(|(_, rank)| *rank);
        Some(out)
    }

    pub(crate) fn next_rank(&self) -> u32 {
        self.players.iter().filter(|(_, r)| r.rank.is_some()).count() as u32 + 1
    }

    // === Invariants ===

    /// The post-move invariant: the table carries no taint from a
    /// failed restore, and no card appears twice among the cards to
    /// cover. A violation is fatal to the whole game.
    pub fn check_integrity(&self) -> Result<(), FatalError> {
        if let Some(violation) = &self.taint {
            return Err(violation.clone());
        }
        for (i, card) in self.to_cover.iter().enumerate() {
            if self.to_cover.iter().skip(i + 1).any(|c| c == card) {
                return Err(FatalError::DuplicateCard(*card));
            }
        }
        Ok(())
    }

    /// Card conservation: every deck card in exactly one location.
    /// Test/debug helper; not on the per-move hot path.
    #[must_use]
    pub fn card_conservation_ok(&self) -> bool {
        use rustc_hash::FxHashMap;

        let mut counts: FxHashMap<Card, usize> = FxHashMap::default();
        let mut total = 0usize;
        let mut count = |card: &Card| {
            *counts.entry(*card).or_default() += 1;
        };
        for player in PlayerId::all(self.player_count()) {
            for card in self.hands[player].iter() {
                count(card);
                total += 1;
            }
        }
        for card in self
            .deck
            .iter()
            .chain(self.to_cover.iter())
            .chain(self.covered.iter())
            .chain(self.discard.iter())
        {
            count(card);
            total += 1;
        }
        total == crate::core::DECK_SIZE && counts.values().all(|&c| c == 1)
    }

    // === Test support ===

    /// Directly overwrite a player's hand, re-seeding the monitor.
    /// Test scaffolding for constructing specific scenarios (duplicate
    /// injection included); call before any cards reach the table.
    pub fn set_hand_for_test(&mut self, player: PlayerId, cards: Vec<Card>) {
        self.hands[player] = cards.into_iter().collect();
        let hands = self.hands.clone();
        self.monitor.start(&hands);
    }

    /// Directly push a card onto the to-cover pile, bypassing move
    /// validation. Test scaffolding for invariant-violation injection.
    pub fn push_to_cover_for_test(&mut self, card: Card) {
        self.to_cover.push_back(card);
    }

    /// Mark the table broken, as a failed restore verification would.
    /// Test scaffolding for exercising the abort path.
    pub fn taint_for_test(&mut self, violation: FatalError) {
        self.taint = Some(violation);
    }
}
