//! Reversible aggregation engine.
//!
//! Stateless functions over [`MatchAggregate`]:
//!
//! - [`apply`] folds one ball into the match.
//! - [`reverse`] takes a previously applied ball back out, field for field.
//! - [`edit_event`] is `reverse(old)` then `apply(new)`, committed together.
//! - [`delete_event`] is `reverse`.
//!
//! Edits and deletes therefore never replay the match. Every function either
//! succeeds or leaves the aggregate exactly as it was.
//!
//! Read-modify-write of one match is not safe under concurrent callers; the
//! storage layer must serialise writers per match.

use chrono::{DateTime, Utc};

use crease_core::{DomainError, DomainResult, MatchId};

use crate::aggregate::MatchAggregate;
use crate::ball::{BallDetails, BallEvent};

/// Fold `event` into `aggregate`.
pub fn apply(aggregate: &mut MatchAggregate, event: &BallEvent) -> DomainResult<()> {
    ensure_same_match(aggregate, event)?;

    let runs = event.runs_scored();
    let team_runs = aggregate
        .team_runs
        .checked_add(runs)
        .ok_or_else(|| overflow(event, "team runs"))?;
    let team_balls_played = aggregate
        .team_balls_played
        .checked_add(legal_ball(event))
        .ok_or_else(|| overflow(event, "team balls played"))?;

    let batsman = aggregate
        .batsman_stats
        .get(event.striker_name())
        .cloned()
        .unwrap_or_default()
        .credited(runs)
        .ok_or_else(|| overflow(event, "batting figures"))?;
    let bowler = aggregate
        .bowler_stats
        .get(event.bowler_name())
        .cloned()
        .unwrap_or_default()
        .charged(runs, event.is_no_ball())
        .ok_or_else(|| overflow(event, "bowling figures"))?;

    aggregate.team_runs = team_runs;
    aggregate.team_balls_played = team_balls_played;
    aggregate
        .batsman_stats
        .insert(event.striker_name().to_string(), batsman);
    aggregate
        .bowler_stats
        .insert(event.bowler_name().to_string(), bowler);
    aggregate.recompute_derived();
    Ok(())
}

/// Take `event` back out of `aggregate`.
///
/// `event` must carry the values that were applied. A counter that would go
/// below zero, or a missing striker/bowler entry, means the ball was never
/// applied: that is reported as [`DomainError::InconsistentState`], never
/// clamped.
pub fn reverse(aggregate: &mut MatchAggregate, event: &BallEvent) -> DomainResult<()> {
    ensure_same_match(aggregate, event)?;

    let runs = event.runs_scored();
    let team_runs = aggregate
        .team_runs
        .checked_sub(runs)
        .ok_or_else(|| underflow(event, "team runs"))?;
    let team_balls_played = aggregate
        .team_balls_played
        .checked_sub(legal_ball(event))
        .ok_or_else(|| underflow(event, "team balls played"))?;

    let batsman = aggregate
        .batsman_stats
        .get(event.striker_name())
        .ok_or_else(|| {
            DomainError::inconsistent(format!(
                "ball {}: striker {:?} has no batting figures",
                event.id_typed(),
                event.striker_name()
            ))
        })?
        .debited(runs)
        .ok_or_else(|| underflow(event, "batting figures"))?;
    let bowler = aggregate
        .bowler_stats
        .get(event.bowler_name())
        .ok_or_else(|| {
            DomainError::inconsistent(format!(
                "ball {}: bowler {:?} has no bowling figures",
                event.id_typed(),
                event.bowler_name()
            ))
        })?
        .discharged(runs, event.is_no_ball())
        .ok_or_else(|| underflow(event, "bowling figures"))?;

    aggregate.team_runs = team_runs;
    aggregate.team_balls_played = team_balls_played;
    // Entries with nothing left attributed are dropped so that a reversal
    // restores the exact pre-apply state.
    if batsman.is_empty() {
        aggregate.batsman_stats.remove(event.striker_name());
    } else {
        aggregate
            .batsman_stats
            .insert(event.striker_name().to_string(), batsman);
    }
    if bowler.is_empty() {
        aggregate.bowler_stats.remove(event.bowler_name());
    } else {
        aggregate
            .bowler_stats
            .insert(event.bowler_name().to_string(), bowler);
    }
    aggregate.recompute_derived();
    Ok(())
}

/// Replace `old_event`'s outcome with `new_details`.
///
/// Returns the edited ball (same id, match and timestamp). New player names
/// start from the same figures an add would give them.
pub fn edit_event(
    aggregate: &mut MatchAggregate,
    old_event: &BallEvent,
    new_details: BallDetails,
) -> DomainResult<BallEvent> {
    new_details.validate()?;
    let updated = old_event.with_details(new_details);

    let mut working = aggregate.clone();
    reverse(&mut working, old_event)?;
    apply(&mut working, &updated)?;

    *aggregate = working;
    Ok(updated)
}

/// Remove `event`'s effect before the caller discards it.
pub fn delete_event(aggregate: &mut MatchAggregate, event: &BallEvent) -> DomainResult<()> {
    reverse(aggregate, event)
}

/// Rebuild a match from scratch by applying `events` in order.
///
/// Not used on the edit/delete path; it exists to cross-check an
/// incrementally maintained aggregate against the stored balls.
pub fn replay<'a>(
    match_id: MatchId,
    started_at: DateTime<Utc>,
    events: impl IntoIterator<Item = &'a BallEvent>,
) -> DomainResult<MatchAggregate> {
    let mut aggregate = MatchAggregate::empty(match_id, started_at);
    for event in events {
        apply(&mut aggregate, event)?;
    }
    Ok(aggregate)
}

fn legal_ball(event: &BallEvent) -> u32 {
    if event.is_no_ball() { 0 } else { 1 }
}

fn ensure_same_match(aggregate: &MatchAggregate, event: &BallEvent) -> DomainResult<()> {
    if event.match_id() != aggregate.id {
        return Err(DomainError::inconsistent(format!(
            "ball {} belongs to match {}, not {}",
            event.id_typed(),
            event.match_id(),
            aggregate.id
        )));
    }
    Ok(())
}

fn overflow(event: &BallEvent, what: &str) -> DomainError {
    DomainError::inconsistent(format!("ball {}: {what} overflow", event.id_typed()))
}

fn underflow(event: &BallEvent, what: &str) -> DomainError {
    DomainError::inconsistent(format!(
        "ball {}: reversing would make {what} negative (was it applied?)",
        event.id_typed()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kickoff() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn ball(match_id: MatchId, runs: u32, striker: &str, bowler: &str, no_ball: bool) -> BallEvent {
        BallEvent::record(
            match_id,
            BallDetails::new(runs, striker, "B", bowler, no_ball),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn add_then_edit() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        let first = ball(match_id, 4, "A", "X", false);

        apply(&mut m, &first).unwrap();
        assert_eq!(m.team_runs(), 4);
        assert_eq!(m.team_balls_played(), 1);
        let a = m.batsman("A").unwrap();
        assert_eq!((a.runs(), a.balls_faced(), a.strike_rate()), (4, 1, 400.0));

        let edited = edit_event(&mut m, &first, BallDetails::new(1, "A", "B", "X", false)).unwrap();
        assert_eq!(edited, first);
        assert_eq!(edited.runs_scored(), 1);
        assert_eq!(m.team_runs(), 1);
        assert_eq!(m.team_balls_played(), 1);
        let a = m.batsman("A").unwrap();
        assert_eq!((a.runs(), a.balls_faced(), a.strike_rate()), (1, 1, 100.0));
        assert_eq!(m.bowler("X").unwrap().economy_rate(), 6.0);
    }

    #[test]
    fn delete_second_ball() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        let first = ball(match_id, 4, "A", "X", false);
        let second = ball(match_id, 2, "A", "X", false);

        apply(&mut m, &first).unwrap();
        apply(&mut m, &second).unwrap();
        let a = m.batsman("A").unwrap();
        assert_eq!((a.runs(), a.balls_faced()), (6, 2));
        assert_eq!(m.current_over().to_string(), "0.2");

        delete_event(&mut m, &second).unwrap();
        let a = m.batsman("A").unwrap();
        assert_eq!((a.runs(), a.balls_faced()), (4, 1));
        assert_eq!(m.team_runs(), 4);
        assert_eq!(m.current_over().to_string(), "0.1");
    }

    #[test]
    fn no_ball_accounting() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        apply(&mut m, &ball(match_id, 5, "A", "X", true)).unwrap();

        let x = m.bowler("X").unwrap();
        assert_eq!(x.deliveries(), 0);
        assert_eq!(x.no_balls(), 1);
        assert_eq!(x.runs_conceded(), 5);
        assert_eq!(x.economy_rate(), 0.0);

        assert_eq!(m.team_balls_played(), 0);
        assert_eq!(m.team_runs(), 5);
        assert_eq!(m.current_run_rate(), 0.0);
        // The striker still faced it.
        assert_eq!(m.batsman("A").unwrap().balls_faced(), 1);
    }

    #[test]
    fn over_ticks_on_legal_balls_only() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        for _ in 0..13 {
            apply(&mut m, &ball(match_id, 1, "A", "X", false)).unwrap();
        }
        apply(&mut m, &ball(match_id, 1, "A", "X", true)).unwrap();

        assert_eq!(m.team_balls_played(), 13);
        assert_eq!(m.current_over().to_string(), "2.1");
        assert_eq!(m.team_runs(), 14);
        assert_eq!(m.current_run_rate(), 14.0 / (13.0 / 6.0));
    }

    #[test]
    fn reversing_an_unapplied_ball_is_inconsistent() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        apply(&mut m, &ball(match_id, 1, "A", "X", false)).unwrap();
        let before = m.clone();

        let stranger = ball(match_id, 0, "Z", "X", false);
        let err = reverse(&mut m, &stranger).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentState(_)));
        assert_eq!(m, before);

        let too_many_runs = ball(match_id, 3, "A", "X", false);
        let err = reverse(&mut m, &too_many_runs).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentState(_)));
        assert_eq!(m, before);

        let phantom_no_ball = ball(match_id, 0, "A", "X", true);
        let err = delete_event(&mut m, &phantom_no_ball).unwrap_err();
        assert!(matches!(err, DomainError::InconsistentState(_)));
        assert_eq!(m, before);
    }

    #[test]
    fn ball_from_another_match_is_rejected() {
        let mut m = MatchAggregate::empty(MatchId::new(), kickoff());
        let foreign = ball(MatchId::new(), 1, "A", "X", false);
        assert!(matches!(
            apply(&mut m, &foreign),
            Err(DomainError::InconsistentState(_))
        ));
        assert!(m.is_empty());
    }

    #[test]
    fn failed_edit_leaves_match_untouched() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        apply(&mut m, &ball(match_id, 2, "A", "X", false)).unwrap();
        let before = m.clone();

        let never_applied = ball(match_id, 6, "Q", "Y", false);
        let err = edit_event(&mut m, &never_applied, BallDetails::new(1, "A", "B", "X", false))
            .unwrap_err();
        assert!(matches!(err, DomainError::InconsistentState(_)));
        assert_eq!(m, before);

        let applied = ball(match_id, 1, "A", "X", false);
        apply(&mut m, &applied).unwrap();
        let before = m.clone();
        let err = edit_event(&mut m, &applied, BallDetails::new(1, "", "B", "X", false))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(m, before);
    }

    #[test]
    fn edit_to_a_new_striker_initialises_like_an_add() {
        let match_id = MatchId::new();
        let mut m = MatchAggregate::empty(match_id, kickoff());
        let original = ball(match_id, 3, "A", "X", false);
        apply(&mut m, &original).unwrap();

        edit_event(&mut m, &original, BallDetails::new(3, "C", "B", "Y", false)).unwrap();

        assert!(m.batsman("A").is_none());
        assert!(m.bowler("X").is_none());
        assert_eq!(m.batsman("C"), Some(&crate::BatsmanStats::new(3, 1)));
        assert_eq!(m.bowler("Y"), Some(&crate::BowlerStats::new(3, 1, 0)));
        assert_eq!(m.bowler("Y").unwrap().economy_rate(), 18.0);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn details_strategy() -> impl Strategy<Value = BallDetails> {
            (
                0u32..=7,
                prop::sample::select(vec!["A", "B", "C"]),
                prop::sample::select(vec!["A", "B", "C"]),
                prop::sample::select(vec!["X", "Y"]),
                any::<bool>(),
            )
                .prop_map(|(runs, striker, non_striker, bowler, no_ball)| {
                    BallDetails::new(runs, striker, non_striker, bowler, no_ball)
                })
        }

        fn record_all(match_id: MatchId, details: Vec<BallDetails>) -> Vec<BallEvent> {
            details
                .into_iter()
                .map(|d| BallEvent::record(match_id, d, Utc::now()).unwrap())
                .collect()
        }

        fn assert_finite(m: &MatchAggregate) -> Result<(), TestCaseError> {
            prop_assert!(m.current_run_rate().is_finite());
            for s in m.batsman_stats().values() {
                prop_assert!(s.strike_rate().is_finite());
                if s.balls_faced() == 0 {
                    prop_assert_eq!(s.strike_rate(), 0.0);
                }
            }
            for s in m.bowler_stats().values() {
                prop_assert!(s.economy_rate().is_finite());
                if s.deliveries() == 0 {
                    prop_assert_eq!(s.economy_rate(), 0.0);
                }
            }
            Ok(())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: reverse(apply(A, E), E) == A, derived fields included.
            #[test]
            fn reverse_undoes_apply(
                history in prop::collection::vec(details_strategy(), 0..20),
                next in details_strategy(),
            ) {
                let match_id = MatchId::new();
                let balls = record_all(match_id, history);
                let before = replay(match_id, kickoff(), &balls).unwrap();

                let event = BallEvent::record(match_id, next, Utc::now()).unwrap();
                let mut m = before.clone();
                apply(&mut m, &event).unwrap();
                reverse(&mut m, &event).unwrap();

                prop_assert_eq!(m, before);
            }

            /// Property: edit_event == apply(reverse(A, old), old.with(new)).
            #[test]
            fn edit_matches_reverse_then_apply(
                history in prop::collection::vec(details_strategy(), 1..20),
                pick in any::<prop::sample::Index>(),
                new_details in details_strategy(),
            ) {
                let match_id = MatchId::new();
                let balls = record_all(match_id, history);
                let start = replay(match_id, kickoff(), &balls).unwrap();
                let old = pick.get(&balls);

                let mut edited = start.clone();
                let updated = edit_event(&mut edited, old, new_details.clone()).unwrap();

                let mut manual = start.clone();
                reverse(&mut manual, old).unwrap();
                apply(&mut manual, &old.with_details(new_details.clone())).unwrap();

                prop_assert_eq!(&edited, &manual);
                prop_assert_eq!(updated.details(), &new_details);
                prop_assert_eq!(updated.id_typed(), old.id_typed());
            }

            /// Property: after any mix of applies and deletes, the aggregate is
            /// the fold of the balls still applied, and every rate is finite.
            #[test]
            fn incremental_state_equals_fold_of_remaining(
                history in prop::collection::vec((details_strategy(), any::<bool>()), 0..30),
            ) {
                let match_id = MatchId::new();
                let mut m = MatchAggregate::empty(match_id, kickoff());
                let mut kept = Vec::new();
                let mut dropped = Vec::new();

                for (details, keep) in history {
                    let event = BallEvent::record(match_id, details, Utc::now()).unwrap();
                    apply(&mut m, &event).unwrap();
                    assert_finite(&m)?;
                    if keep { kept.push(event) } else { dropped.push(event) }
                }
                for event in dropped.iter().rev() {
                    delete_event(&mut m, event).unwrap();
                    assert_finite(&m)?;
                }

                let legal = kept.iter().filter(|b| !b.is_no_ball()).count() as u32;
                let runs: u32 = kept.iter().map(|b| b.runs_scored()).sum();
                prop_assert_eq!(m.team_balls_played(), legal);
                prop_assert_eq!(m.team_runs(), runs);
                prop_assert_eq!(m, replay(match_id, kickoff(), &kept).unwrap());
            }
        }
    }
}
