//! Whole games through the coordinator: threads, lock, engine and
//! telemetry together.

use std::time::Duration;

use moska_engine::eval::LinearEvaluator;
use moska_engine::game::agent::{Agent, BaselineAgent, RandomAgent};
use moska_engine::game::{self, GameOptions, GameOutcome};
use moska_engine::moves::Move;
use moska_engine::table::view::PlayerView;
use moska_engine::FailureReason;
use smallvec::smallvec;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("player-{i}")).collect()
}

fn baselines(n: usize) -> Vec<Box<dyn Agent>> {
    (0..n).map(|_| Box::new(BaselineAgent) as Box<dyn Agent>).collect()
}

fn finished_rankings(outcome: &GameOutcome, n: usize) -> Vec<(String, u32)> {
    match outcome {
        GameOutcome::Finished { rankings } => {
            assert_eq!(rankings.len(), n);
            let mut ranks: Vec<u32> = rankings.iter().map(|(_, r)| *r).collect();
            ranks.sort_unstable();
            assert_eq!(ranks, (1..=n as u32).collect::<Vec<_>>());
            rankings.clone()
        }
        GameOutcome::Failed { reason } => panic!("game failed: {reason}"),
    }
}

#[test]
fn test_two_baseline_players_finish() {
    init_tracing();
    for seed in [1u64, 17, 4242] {
        let mut options = GameOptions::new(names(2), seed);
        options.timeout = Duration::from_secs(60);
        let report = game::run(options, baselines(2)).unwrap();

        finished_rankings(&report.outcome, 2);
        let table = report.table.expect("clean games keep their table");
        assert!(table.is_over());
        assert!(table.card_conservation_ok());
        assert!(table.check_integrity().is_ok());
        assert!(table.events().len() > 0);
        assert!(table.deck().is_empty());
    }
}

/// The plain two-player happy path on a tight budget: views, decisions
/// and submissions must keep flowing through the baton or the deadline
/// hits first.
#[test]
fn test_baseline_game_reaches_a_ranking() {
    init_tracing();
    let mut options = GameOptions::new(names(2), 5);
    options.timeout = Duration::from_secs(30);
    let report = game::run(options, baselines(2)).unwrap();

    finished_rankings(&report.outcome, 2);
}

#[test]
fn test_four_baseline_players_finish() {
    let mut options = GameOptions::new(names(4), 99);
    options.timeout = Duration::from_secs(60);
    options.evaluator = Some(Box::new(LinearEvaluator::uniform(1.0, 169)));
    let report = game::run(options, baselines(4)).unwrap();

    finished_rankings(&report.outcome, 4);
    let table = report.table.unwrap();
    assert!(table.card_conservation_ok());
    assert!(table.events().to_json().unwrap().starts_with('['));
    // Every committed move was scored for every seat.
    assert!(table
        .events()
        .iter()
        .all(|event| event.evals.as_ref().map(Vec::len) == Some(4)));
}

#[test]
fn test_mixed_agents_preserve_the_cards() {
    let mut options = GameOptions::new(names(3), 7);
    options.timeout = Duration::from_secs(20);
    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(BaselineAgent),
        Box::new(RandomAgent::new(5)),
        Box::new(BaselineAgent),
    ];
    let report = game::run(options, agents).unwrap();

    // Random play may not finish inside the budget; the table must be
    // intact either way.
    let table = report.table.expect("no panic, so the table survives");
    assert!(table.card_conservation_ok());
    assert!(table.check_integrity().is_ok());
    if let GameOutcome::Finished { rankings } = &report.outcome {
        assert_eq!(rankings.len(), 3);
    }
}

/// Proposes a move that no position can accept.
struct BrokenAgent;

impl Agent for BrokenAgent {
    fn decide(&mut self, _view: &PlayerView) -> Option<Move> {
        Some(Move::InitialPlay { cards: smallvec![] })
    }
}

#[test]
fn test_broken_agent_fails_the_game_without_a_ranking() {
    init_tracing();
    let mut options = GameOptions::new(vec!["ok".to_string(), "bad".to_string()], 3);
    options.timeout = Duration::from_secs(60);
    let agents: Vec<Box<dyn Agent>> = vec![Box::new(BaselineAgent), Box::new(BrokenAgent)];
    let report = game::run(options, agents).unwrap();

    match report.outcome {
        GameOutcome::Failed {
            reason: FailureReason::PlayerFailed { name, .. },
        } => assert_eq!(name, "bad"),
        other => panic!("expected a player failure, got {other:?}"),
    }
}

#[test]
fn test_zero_timeout_reports_timed_out() {
    let mut options = GameOptions::new(names(2), 23);
    options.timeout = Duration::ZERO;
    let report = game::run(options, baselines(2)).unwrap();

    assert!(matches!(
        report.outcome,
        GameOutcome::Failed {
            reason: FailureReason::TimedOut { .. }
        }
    ));
}

#[test]
fn test_agent_count_must_match_names() {
    let err = game::run(GameOptions::new(names(3), 1), baselines(2));
    assert!(err.is_err());
}
