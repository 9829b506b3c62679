//! Property tests for the session engine invariants.

use proptest::prelude::*;
use questline_core::session::{
    ActivityCatalog, ActivityDescriptor, ActivityKind, ActivityStatus, Advance, EngineSettings,
    ManualClock, SessionConfig, SessionEngine, SessionPhase,
};

fn engine(len: usize, max_tokens: u32) -> (SessionEngine<ManualClock>, ManualClock) {
    let activities = (0..len)
        .map(|i| ActivityDescriptor::new(format!("a{i}"), format!("A{i}"), ActivityKind::Speech, 5))
        .collect();
    let config = SessionConfig::new("prop", "Property Quest", ActivityCatalog::new(activities));
    let clock = ManualClock::default();
    let settings = EngineSettings {
        max_tokens,
        ..EngineSettings::default()
    };
    let engine = SessionEngine::with_clock(config, settings, clock.clone()).unwrap();
    (engine, clock)
}

#[derive(Debug, Clone)]
enum Op {
    Wait(i64),
    /// Wall clock jumps backwards.
    Rewind(i64),
    Pause,
    Resume,
    Tick,
    Next,
    Award,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..600).prop_map(Op::Wait),
        (0i64..60).prop_map(Op::Rewind),
        Just(Op::Pause),
        Just(Op::Resume),
        Just(Op::Tick),
        Just(Op::Next),
        Just(Op::Award),
    ]
}

fn apply(engine: &mut SessionEngine<ManualClock>, clock: &ManualClock, op: &Op) {
    // Rejected calls are part of the property: they must not corrupt state.
    match op {
        Op::Wait(secs) => clock.advance_secs(*secs),
        Op::Rewind(secs) => clock.advance_secs(-secs),
        Op::Pause => {
            let _ = engine.pause();
        }
        Op::Resume => {
            let _ = engine.resume();
        }
        Op::Tick => {
            engine.tick();
        }
        Op::Next => {
            let _ = engine.next_activity();
        }
        Op::Award => {
            let _ = engine.award_token();
        }
    }
}

proptest! {
    #[test]
    fn exactly_one_activity_in_progress_while_live(len in 1usize..8, ops in prop::collection::vec(op(), 0..40)) {
        let (mut engine, clock) = engine(len, 10);
        engine.start().unwrap();
        for op in &ops {
            apply(&mut engine, &clock, op);
            if engine.phase() == SessionPhase::Ended {
                break;
            }
            let in_progress = engine
                .ledger()
                .entries()
                .iter()
                .filter(|e| e.status == ActivityStatus::InProgress)
                .count();
            prop_assert_eq!(in_progress, 1);
            prop_assert_eq!(engine.ledger().in_progress_index(), Some(engine.current_index()));
        }
    }

    #[test]
    fn elapsed_never_decreases(ops in prop::collection::vec(op(), 0..60)) {
        let (mut engine, clock) = engine(3, 10);
        engine.start().unwrap();
        let mut last = engine.elapsed_seconds();
        for op in &ops {
            apply(&mut engine, &clock, op);
            let now = engine.elapsed_seconds();
            prop_assert!(now >= last, "elapsed went from {} to {}", last, now);
            last = now;
        }
    }

    #[test]
    fn forward_advance_completes_everything_before_target(len in 2usize..10, target in 1usize..10) {
        prop_assume!(target < len);
        let (mut engine, _) = engine(len, 10);
        engine.start().unwrap();
        let advance = engine.advance_activity(target).unwrap();
        prop_assert_eq!(advance, Advance::Moved { from: 0, to: target });
        prop_assert_eq!(engine.ledger().completed_count(), target);
        prop_assert_eq!(engine.current_index(), target);
    }

    #[test]
    fn tokens_never_exceed_cap(max in 1u32..20, awards in 0usize..40) {
        let (mut engine, _) = engine(2, max);
        engine.start().unwrap();
        for _ in 0..awards {
            let count = engine.award_token().unwrap();
            prop_assert!(count <= max);
        }
        prop_assert_eq!(engine.token_count(), (awards as u32).min(max));
        prop_assert_eq!(engine.ledger().total_tokens(), engine.token_count());
    }

    #[test]
    fn advancing_past_the_end_completes_every_activity(len in 1usize..10, extra in 0usize..5, step_first in any::<bool>()) {
        let (mut engine, _) = engine(len, 10);
        engine.start().unwrap();
        if step_first && len > 1 {
            engine.next_activity().unwrap();
        }
        let Advance::Ended(summary) = engine.advance_activity(len + extra).unwrap() else {
            panic!("advance past the end must end the session");
        };
        prop_assert!(summary.is_full_run());
        prop_assert_eq!(engine.phase(), SessionPhase::Ended);
    }
}
