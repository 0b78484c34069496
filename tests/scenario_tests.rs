//! Scripted turns on a stacked deck, checking the move engine and the
//! turn bookkeeping end to end.

use moska_engine::moves::CoverPair;
use moska_engine::{
    Card, Deck, FatalError, Move, MoveError, PlayerId, Suit, Table, HAND_SIZE,
};
use smallvec::smallvec;

fn card(rank: u8, suit: Suit) -> Card {
    Card::of(rank, suit)
}

/// A deck that deals `p0` to the first seat, `p1` to the second, and
/// turns up `trump_card` as trump. The rest of the pack follows in a
/// fixed order.
fn stacked_deck(p0: &[Card], p1: &[Card], trump_card: Card) -> Deck {
    let mut order: Vec<Card> = Vec::with_capacity(52);
    order.extend_from_slice(p0);
    order.extend_from_slice(p1);
    order.push(trump_card);
    for suit in Suit::ALL {
        for rank in 2..=14 {
            let c = card(rank, suit);
            if !order.contains(&c) {
                order.push(c);
            }
        }
    }
    assert_eq!(order.len(), 52);
    Deck::from_cards(order)
}

/// Target's hand: can cover 7♣ (with 9♣) and 7♠ (with the trump 5♥).
fn covering_table() -> Table {
    let p0 = [
        card(9, Suit::Clubs),
        card(5, Suit::Hearts),
        card(6, Suit::Diamonds),
        card(12, Suit::Diamonds),
        card(14, Suit::Spades),
        card(8, Suit::Diamonds),
    ];
    let p1 = [
        card(7, Suit::Clubs),
        card(7, Suit::Spades),
        card(9, Suit::Diamonds),
        card(10, Suit::Diamonds),
        card(11, Suit::Diamonds),
        card(13, Suit::Clubs),
    ];
    let deck = stacked_deck(&p0, &p1, card(14, Suit::Hearts));
    let names = vec!["target".to_string(), "attacker".to_string()];
    Table::deal(&names, deck).unwrap()
}

#[test]
fn test_full_defended_turn() {
    let mut table = covering_table();
    assert_eq!(table.trump(), Suit::Hearts);
    let target = table.target();
    let attacker = table.initiator().unwrap();
    assert_eq!(target, PlayerId::new(0));
    assert_eq!(attacker, PlayerId::new(1));

    // Pair opening.
    let seven_c = card(7, Suit::Clubs);
    let seven_s = card(7, Suit::Spades);
    table
        .apply(
            attacker,
            &Move::InitialPlay {
                cards: smallvec![seven_c, seven_s],
            },
        )
        .unwrap();
    assert_eq!(table.to_cover().len(), 2);
    assert_eq!(table.hand(attacker).len(), HAND_SIZE);

    // The turn cannot end before the attacker has skipped.
    let err = table.apply(target, &Move::EndTurn { take_covered: false });
    assert_eq!(err.unwrap_err(), MoveError::OpponentsNotReady);
    table.apply(attacker, &Move::Skip).unwrap();

    // Same suit, higher rank.
    table
        .apply(
            target,
            &Move::PlayFallFromHand {
                pairs: smallvec![CoverPair {
                    cover: card(9, Suit::Clubs),
                    covered: seven_c,
                }],
            },
        )
        .unwrap();

    // Covering voided the attacker's skip.
    let err = table.apply(target, &Move::EndTurn { take_covered: false });
    assert_eq!(err.unwrap_err(), MoveError::OpponentsNotReady);
    table.apply(attacker, &Move::Skip).unwrap();

    // Trump over a plain suit.
    table
        .apply(
            target,
            &Move::PlayFallFromHand {
                pairs: smallvec![CoverPair {
                    cover: card(5, Suit::Hearts),
                    covered: seven_s,
                }],
            },
        )
        .unwrap();
    table.apply(attacker, &Move::Skip).unwrap();

    // Clean end: everything covered goes to the discard, the target
    // refills, and the target role moves on.
    let applied = table
        .apply(target, &Move::EndTurn { take_covered: false })
        .unwrap();
    assert!(applied.picked_up.is_empty());
    assert_eq!(applied.drawn.len(), 2);
    assert!(table.table_is_empty());
    assert_eq!(table.discard().len(), 4);
    assert_eq!(table.hand(target).len(), HAND_SIZE);
    assert_eq!(table.target(), attacker);

    assert_eq!(table.turn_number(), 7);
    assert_eq!(table.events().len(), 7);
    assert!(table.card_conservation_ok());
    assert!(table.check_integrity().is_ok());

    // The monitor mirrors the real hands it can see.
    assert_eq!(table.monitor().hand_of(target), table.hand(target));
    assert_eq!(table.monitor().hand_of(attacker), table.hand(attacker));
}

#[test]
fn test_picking_up_skips_the_target_as_initiator() {
    let mut table = covering_table();
    let target = table.target();
    let attacker = table.initiator().unwrap();

    let king = card(13, Suit::Clubs);
    table
        .apply(
            attacker,
            &Move::InitialPlay {
                cards: smallvec![king],
            },
        )
        .unwrap();
    table.apply(attacker, &Move::Skip).unwrap();

    let applied = table
        .apply(target, &Move::EndTurn { take_covered: false })
        .unwrap();
    assert_eq!(applied.picked_up.as_slice(), [king]);
    assert!(table.hand(target).contains(&king));
    assert_eq!(table.hand(target).len(), HAND_SIZE + 1);

    // Two seats: skipping the lifter as initiator wraps back around.
    assert_eq!(table.target(), target);
    assert_eq!(table.initiator(), Some(attacker));
    assert!(table.card_conservation_ok());
}

#[test]
fn test_rejected_moves() {
    let mut table = covering_table();
    let target = table.target();
    let attacker = table.initiator().unwrap();

    // Only the initiator may open.
    let nine = card(9, Suit::Clubs);
    let err = table.apply(
        target,
        &Move::InitialPlay {
            cards: smallvec![nine],
        },
    );
    assert_eq!(err.unwrap_err(), MoveError::NotInitiator(target));

    // Mixed-rank openings need every rank at least twice.
    let err = table.apply(
        attacker,
        &Move::InitialPlay {
            cards: smallvec![card(7, Suit::Clubs), card(9, Suit::Diamonds)],
        },
    );
    assert_eq!(err.unwrap_err(), MoveError::IllegalOpening);

    // The same card cannot be played twice in one move.
    let seven = card(7, Suit::Clubs);
    let err = table.apply(
        attacker,
        &Move::InitialPlay {
            cards: smallvec![seven, seven],
        },
    );
    assert_eq!(err.unwrap_err(), MoveError::DuplicatePlay(seven));

    table
        .apply(
            attacker,
            &Move::InitialPlay {
                cards: smallvec![seven],
            },
        )
        .unwrap();

    // A higher card of another plain suit does not cover.
    let err = table.apply(
        target,
        &Move::PlayFallFromHand {
            pairs: smallvec![CoverPair {
                cover: card(12, Suit::Diamonds),
                covered: seven,
            }],
        },
    );
    assert_eq!(
        err.unwrap_err(),
        MoveError::CannotCover {
            cover: card(12, Suit::Diamonds),
            covered: seven,
        }
    );

    // Off-rank attacks are rejected while a 7 is the only rank out.
    let err = table.apply(
        attacker,
        &Move::PlayToOther {
            cards: smallvec![card(13, Suit::Clubs)],
        },
    );
    assert_eq!(
        err.unwrap_err(),
        MoveError::RankNotOnTable(card(13, Suit::Clubs).rank)
    );

    // Nothing above mutated anything.
    assert_eq!(table.to_cover().len(), 1);
    assert!(table.card_conservation_ok());
}

#[test]
fn test_duplicated_card_in_two_hands_is_fatal() {
    let mut table = covering_table();
    let target = table.target();
    let attacker = table.initiator().unwrap();

    // The same card in two hands: legal moves then put it on the table
    // twice, which the post-move invariant must catch.
    let dup = card(5, Suit::Spades);
    table.set_hand_for_test(attacker, vec![dup, card(9, Suit::Diamonds)]);
    table.set_hand_for_test(target, vec![dup, card(8, Suit::Diamonds)]);

    table
        .apply(
            attacker,
            &Move::InitialPlay {
                cards: smallvec![dup],
            },
        )
        .unwrap();
    table
        .apply(
            target,
            &Move::PlayToSelf {
                cards: smallvec![dup],
            },
        )
        .unwrap();

    assert!(matches!(
        table.check_integrity(),
        Err(FatalError::DuplicateCard(c)) if c == dup
    ));
}

#[test]
fn test_target_plays_to_itself_from_deck() {
    let mut table = covering_table();
    let target = table.target();
    let attacker = table.initiator().unwrap();

    table
        .apply(
            attacker,
            &Move::InitialPlay {
                cards: smallvec![card(7, Suit::Clubs)],
            },
        )
        .unwrap();

    let deck_before = table.deck().len();
    let applied = table.apply(target, &Move::PlayToSelfFromDeck).unwrap();
    assert_eq!(table.deck().len(), deck_before - 1);
    assert_eq!(applied.drawn.len(), 1);
    let drawn = applied.drawn[0];
    assert!(drawn.kopled);
    assert!(table.to_cover().contains(&drawn));

    // Lifted cards come back to the hand with the kopled mark cleared.
    table.apply(attacker, &Move::Skip).unwrap();
    table
        .apply(target, &Move::EndTurn { take_covered: false })
        .unwrap();
    assert!(table
        .hand(target)
        .iter()
        .all(|c| !c.kopled));
    assert!(table.card_conservation_ok());
}
