//! Turn Rotation
//!
//! Pure functions that order participants for the next turn.
//!
//! Two orderings exist and they follow different rules:
//!
//! - [`next_participants`]: round-robin from the acting seat. The acting
//!   participant goes last. Decided participants are still included.
//! - [`quit_order`]: used when the local player quits. Still-playing
//!   opponents go first, the local participant last, decided opponents are
//!   left out.

use crate::game::state::{Match, Participant, PlayerId, Seat, DECIDED_TO_END, SEAT_COUNT};

/// Seat of the participant the match records as current.
///
/// Falls back to the first seat when no participant matches the recorded
/// current player, including when none is recorded.
pub fn current_seat(game_match: &Match) -> Seat {
    game_match
        .current_participant
        .and_then(|current| game_match.seat_of(&current))
        .unwrap_or(Seat::FIRST)
}

/// Next participant ordering after `acting` has played.
///
/// Returns seats `acting+1`, `acting+2`, `acting` (mod 3). The output is
/// always a permutation of the three participants.
pub fn next_participants(acting: Seat, game_match: &Match) -> [Participant; SEAT_COUNT] {
    [
        *game_match.participant(acting.offset(1)),
        *game_match.participant(acting.offset(2)),
        *game_match.participant(acting),
    ]
}

/// [`next_participants`] from the recorded current participant.
pub fn next_participants_from_current(game_match: &Match) -> [Participant; SEAT_COUNT] {
    next_participants(current_seat(game_match), game_match)
}

/// Participant ordering sent with a voluntary quit.
///
/// Walks the seats in order. The local player's participant is appended,
/// every other still-playing participant is inserted at the front, and
/// other decided participants are dropped.
pub fn quit_order(game_match: &Match, local: &PlayerId) -> Vec<Participant> {
    let mut order = Vec::with_capacity(SEAT_COUNT);

    for participant in game_match.participants() {
        if participant.is_player(local) {
            order.push(*participant);
        } else if participant.is_playing() {
            order.insert(0, *participant);
        }
    }

    order
}

/// Whether the decided count ends the match (exactly two of three).
#[inline]
pub fn is_terminal(game_match: &Match) -> bool {
    game_match.decided_count() == DECIDED_TO_END
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{MatchId, MatchOutcome};
    use proptest::prelude::*;

    fn player(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    fn three_player_match() -> Match {
        Match::new(MatchId::new_v4(), [Some(player(1)), Some(player(2)), Some(player(3))])
    }

    fn seat(index: usize) -> Seat {
        Seat::new(index).unwrap()
    }

    fn outcome_strategy() -> impl Strategy<Value = MatchOutcome> {
        prop_oneof![
            Just(MatchOutcome::None),
            Just(MatchOutcome::Won),
            Just(MatchOutcome::Lost),
            Just(MatchOutcome::Tied),
            Just(MatchOutcome::Quit),
        ]
    }

    #[test]
    fn test_rotation_from_first_seat() {
        let m = three_player_match();
        let order = next_participants_from_current(&m);

        let ids: Vec<_> = order.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![Some(player(2)), Some(player(3)), Some(player(1))]);
    }

    #[test]
    fn test_rotation_wraps_from_last_seat() {
        let m = three_player_match();
        let order = next_participants(seat(2), &m);

        let seats: Vec<usize> = order.iter().map(|p| p.seat.index()).collect();
        assert_eq!(seats, vec![0, 1, 2]);
    }

    #[test]
    fn test_rotation_keeps_decided_participants() {
        let mut m = three_player_match();
        m.set_outcome(seat(1), MatchOutcome::Lost);

        let order = next_participants(seat(0), &m);
        assert_eq!(order[0].seat, seat(1));
        assert_eq!(order[0].outcome, MatchOutcome::Lost);
    }

    #[test]
    fn test_current_seat_resolves_recorded_player() {
        let mut m = three_player_match();
        m.current_participant = Some(player(3));
        assert_eq!(current_seat(&m), seat(2));
    }

    #[test]
    fn test_current_seat_falls_back_to_first() {
        let mut m = three_player_match();
        m.current_participant = Some(player(42));
        assert_eq!(current_seat(&m), Seat::FIRST);

        m.current_participant = None;
        assert_eq!(current_seat(&m), Seat::FIRST);
    }

    #[test]
    fn test_quit_order_local_first_when_others_decided() {
        let mut m = three_player_match();
        m.set_outcome(seat(0), MatchOutcome::Lost);
        m.set_outcome(seat(2), MatchOutcome::Lost);

        let order = quit_order(&m, &player(2));
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].player_id, Some(player(2)));
    }

    #[test]
    fn test_quit_order_puts_playing_opponents_ahead() {
        let m = three_player_match();

        // Seat 0 is local; seats 1 and 2 are inserted at the front in turn.
        let order = quit_order(&m, &player(1));
        let ids: Vec<_> = order.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![Some(player(3)), Some(player(2)), Some(player(1))]);
    }

    #[test]
    fn test_quit_order_drops_decided_opponents() {
        let mut m = three_player_match();
        m.set_outcome(seat(1), MatchOutcome::Lost);

        let order = quit_order(&m, &player(1));
        let ids: Vec<_> = order.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![Some(player(3)), Some(player(1))]);
    }

    #[test]
    fn test_quit_order_without_local_player() {
        let m = Match::new(MatchId::new_v4(), [Some(player(1)), None, Some(player(3))]);

        // An empty seat is still playing and not local.
        let order = quit_order(&m, &player(9));
        assert_eq!(order.len(), 3);
        assert!(order.iter().all(|p| !p.is_player(&player(9))));
    }

    #[test]
    fn test_is_terminal_requires_exactly_two() {
        let mut m = three_player_match();
        assert!(!is_terminal(&m));

        m.set_outcome(seat(0), MatchOutcome::Lost);
        assert!(!is_terminal(&m));

        m.set_outcome(seat(1), MatchOutcome::Quit);
        assert!(is_terminal(&m));

        m.set_outcome(seat(2), MatchOutcome::Won);
        assert!(!is_terminal(&m));
    }

    proptest! {
        #[test]
        fn prop_rotation_is_permutation_with_actor_last(
            acting in 0usize..SEAT_COUNT,
            outcomes in proptest::array::uniform3(outcome_strategy()),
        ) {
            let mut m = three_player_match();
            for (index, outcome) in outcomes.iter().enumerate() {
                m.set_outcome(seat(index), *outcome);
            }

            let order = next_participants(seat(acting), &m);
            let mut seats: Vec<usize> = order.iter().map(|p| p.seat.index()).collect();

            prop_assert_eq!(seats[0], (acting + 1) % SEAT_COUNT);
            prop_assert_eq!(seats[1], (acting + 2) % SEAT_COUNT);
            prop_assert_eq!(seats[2], acting);

            seats.sort_unstable();
            prop_assert_eq!(seats, vec![0, 1, 2]);
        }

        #[test]
        fn prop_terminal_iff_two_decided(
            outcomes in proptest::array::uniform3(outcome_strategy()),
        ) {
            let mut m = three_player_match();
            for (index, outcome) in outcomes.iter().enumerate() {
                m.set_outcome(seat(index), *outcome);
            }

            let decided = outcomes.iter().filter(|o| o.is_decided()).count();
            prop_assert_eq!(is_terminal(&m), decided == 2);
        }

        #[test]
        fn prop_quit_order_never_duplicates(
            local in 0u8..4,
            outcomes in proptest::array::uniform3(outcome_strategy()),
        ) {
            let mut m = three_player_match();
            for (index, outcome) in outcomes.iter().enumerate() {
                m.set_outcome(seat(index), *outcome);
            }

            let order = quit_order(&m, &player(local + 1));
            let mut seats: Vec<usize> = order.iter().map(|p| p.seat.index()).collect();
            seats.sort_unstable();
            seats.dedup();
            prop_assert_eq!(seats.len(), order.len());
        }
    }
}
