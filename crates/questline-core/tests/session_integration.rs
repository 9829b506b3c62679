//! End-to-end session flows through the public API.
//!
//! Time is driven by `ManualClock`; nothing here sleeps.

use questline_core::activities::{
    ActivityError, ActivityModule, CalmingBreak, MovementDrill, RolePlayDrill, SpeechDrill,
    TopicFact,
};
use questline_core::error::SessionError;
use questline_core::session::{
    ActivityCatalog, ActivityDescriptor, ActivityKind, ActivityStatus, Advance, Clock,
    EngineSettings, ManualClock, SessionConfig, SessionEngine, SessionPhase,
};
use questline_core::{Database, Event, EventRecorder};

// ============================================================================
// Helpers
// ============================================================================

fn config_with(kinds: &[(ActivityKind, u64)]) -> SessionConfig {
    let activities = kinds
        .iter()
        .enumerate()
        .map(|(i, (kind, minutes))| {
            ActivityDescriptor::new(format!("act-{i}"), format!("Activity {i}"), *kind, *minutes)
        })
        .collect();
    SessionConfig::new("session-test", "Integration Quest", ActivityCatalog::new(activities))
        .with_speech_targets(["R sounds", "S blends"])
        .with_behavior_focus(["Turn-taking"])
}

fn engine_for(config: SessionConfig, max_tokens: u32) -> (SessionEngine<ManualClock>, ManualClock) {
    let clock = ManualClock::default();
    let settings = EngineSettings {
        max_tokens,
        ..EngineSettings::default()
    };
    let engine = SessionEngine::with_clock(config, settings, clock.clone()).unwrap();
    (engine, clock)
}

fn speech_session(minutes: &[u64]) -> (SessionEngine<ManualClock>, ManualClock) {
    let kinds: Vec<_> = minutes.iter().map(|m| (ActivityKind::Speech, *m)).collect();
    engine_for(config_with(&kinds), 10)
}

// ============================================================================
// Lifecycle scenarios
// ============================================================================

#[test]
fn advancing_past_the_last_activity_ends_with_full_summary() {
    let (mut engine, _) = speech_session(&[5, 10, 3]);
    engine.start().unwrap();
    engine.advance_activity(1).unwrap();
    engine.advance_activity(2).unwrap();
    engine.record_success_rate(2, 90.0).unwrap();

    let Advance::Ended(summary) = engine.advance_activity(3).unwrap() else {
        panic!("expected the session to end");
    };
    assert_eq!(engine.phase(), SessionPhase::Ended);
    assert!(summary
        .activities
        .iter()
        .all(|a| a.status == ActivityStatus::Completed));
    assert_eq!(summary.activities[2].success_rate, Some(90.0));
    assert!(summary.is_full_run());
}

#[test]
fn token_count_is_capped() {
    let (mut engine, _) = speech_session(&[5]);
    engine.start().unwrap();
    for _ in 0..12 {
        engine.award_token().unwrap();
    }
    assert_eq!(engine.token_count(), 10);
    assert_eq!(engine.ledger().total_tokens(), 10);
}

#[test]
fn paused_time_is_excluded() {
    let (mut engine, clock) = speech_session(&[5]);
    engine.start().unwrap();
    clock.advance_secs(10);
    engine.pause().unwrap();
    clock.advance_secs(5);
    assert_eq!(engine.elapsed_seconds(), 10);
    engine.resume().unwrap();
    clock.advance_secs(5);
    assert_eq!(engine.elapsed_seconds(), 15);
}

#[test]
fn pause_before_start_is_a_state_error() {
    let (mut engine, _) = speech_session(&[5]);
    let err = engine.pause().unwrap_err();
    assert!(matches!(err, SessionError::State { .. }));
    assert_eq!(engine.phase(), SessionPhase::NotStarted);
}

#[test]
fn ended_session_is_terminal() {
    let (mut engine, _) = speech_session(&[5, 5]);
    engine.start().unwrap();
    let summary = engine.end().unwrap();
    assert_eq!(summary.activities[0].status, ActivityStatus::InProgress);

    for result in [engine.resume(), engine.pause(), engine.start()] {
        assert!(matches!(result, Err(SessionError::State { .. })));
    }
    assert!(engine.award_token().is_err());
    assert!(engine.end().is_err());
    assert_eq!(engine.summary(), Some(&summary));
}

#[test]
fn tick_drives_countdown_and_planned_duration_event() {
    let (mut engine, clock) = speech_session(&[1]);
    let recorder = EventRecorder::new();
    engine.subscribe(recorder.clone());
    engine.start().unwrap();

    clock.advance_secs(30);
    assert_eq!(
        engine.tick(),
        Some(Event::Tick {
            elapsed_secs: 30,
            remaining_secs: 30
        })
    );
    clock.advance_secs(40);
    assert!(matches!(
        engine.tick(),
        Some(Event::PlannedDurationReached { planned_secs: 60, .. })
    ));
    assert!(matches!(engine.tick(), Some(Event::Tick { remaining_secs: 0, .. })));

    engine.pause().unwrap();
    assert_eq!(engine.tick(), None);

    let reached = recorder
        .events()
        .iter()
        .filter(|e| matches!(e, Event::PlannedDurationReached { .. }))
        .count();
    assert_eq!(reached, 1);
}

#[test]
fn saved_state_resumes_in_a_new_engine() {
    let (mut engine, clock) = speech_session(&[5, 5]);
    engine.start().unwrap();
    engine.award_token().unwrap();
    clock.advance_secs(20);

    let json = serde_json::to_string(engine.state()).unwrap();
    let restored = serde_json::from_str(&json).unwrap();
    let mut engine = SessionEngine::from_state(restored, clock.clone());

    assert_eq!(engine.phase(), SessionPhase::Running);
    assert_eq!(engine.token_count(), 1);
    assert_eq!(engine.elapsed_seconds(), 20);
    engine.next_activity().unwrap();
    assert_eq!(engine.current_index(), 1);
}

#[test]
fn finished_summary_is_archived() {
    let (mut engine, clock) = speech_session(&[5]);
    engine.start().unwrap();
    clock.advance_secs(42);
    let summary = engine.end().unwrap();

    let db = Database::open_memory().unwrap();
    db.record_summary(&summary).unwrap();
    let records = db.list_summaries(None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].elapsed_seconds, 42);
    assert_eq!(db.get_summary("session-test").unwrap(), Some(summary));
}

// ============================================================================
// Activity modules driving a real engine
// ============================================================================

#[test]
fn speech_drill_completion_advances_engine() {
    let (mut engine, _) = engine_for(
        config_with(&[(ActivityKind::Speech, 5), (ActivityKind::Break, 2)]),
        10,
    );
    engine.start().unwrap();

    let mut drill = SpeechDrill::new(["rabbit", "rocket", "river", "red"]).unwrap();
    for _ in 0..4 {
        drill.start_recording().unwrap();
        drill.stop_recording(&mut engine).unwrap();
        drill.mark_success(&mut engine).unwrap();
        drill.next_word(&mut engine).unwrap();
    }

    // Each word raises power by a quarter.
    assert_eq!(engine.token_count(), 4);
    assert_eq!(engine.current_index(), 1);
    let first = &engine.ledger().entries()[0];
    assert_eq!(first.status, ActivityStatus::Completed);
    assert_eq!(first.success_rate, Some(100.0));
    assert_eq!(first.tokens_earned, 4);
}

#[test]
fn movement_and_role_play_then_break_finish_the_session() {
    let (mut engine, clock) = engine_for(
        config_with(&[
            (ActivityKind::Movement, 5),
            (ActivityKind::Expert, 5),
            (ActivityKind::Break, 2),
        ]),
        10,
    );
    engine.start().unwrap();

    let mut movement = MovementDrill::new(["jump", "roar"]);
    movement.complete_action(&mut engine, true).unwrap();
    movement.next_action(&mut engine).unwrap();
    movement.complete_action(&mut engine, false).unwrap();
    assert!(matches!(
        movement.next_action(&mut engine).unwrap(),
        Some(Advance::Moved { from: 0, to: 1 })
    ));

    let facts = vec![
        TopicFact::new("f1", "Dragons breathe fire", 1),
        TopicFact::new("f2", "Dragons can fly", 1),
    ];
    let mut role_play = RolePlayDrill::new("dragons", facts, 1).unwrap();
    role_play.mark_clarity(&mut engine, 4).unwrap();
    role_play.next_fact(&mut engine).unwrap();
    role_play.mark_clarity(&mut engine, 1).unwrap();
    role_play.next_fact(&mut engine).unwrap();
    assert_eq!(engine.current_index(), 2);

    let mut calm = CalmingBreak::new(120, clock.now());
    clock.advance_secs(120);
    let advance = calm.poll(&mut engine, clock.now()).unwrap();
    assert!(matches!(advance, Some(Advance::Ended(_))));

    let summary = engine.summary().unwrap();
    let rates: Vec<_> = summary.activities.iter().map(|a| a.success_rate).collect();
    assert_eq!(rates, [Some(50.0), Some(50.0), None]);
    assert!(summary.is_full_run());
}

#[test]
fn activity_callbacks_are_rejected_after_end() {
    let (mut engine, _) = speech_session(&[5]);
    engine.start().unwrap();
    engine.end().unwrap();

    let mut drill = SpeechDrill::new(["cat"]).unwrap();
    drill.start_recording().unwrap();
    assert!(matches!(
        drill.stop_recording(&mut engine),
        Err(ActivityError::Host(SessionError::State { .. }))
    ));
    assert_eq!(drill.tally().attempts, 0);
}

#[test]
fn rejected_success_leaves_drill_untouched() {
    let (mut engine, _) = speech_session(&[5]);
    engine.start().unwrap();
    engine.end().unwrap();

    let mut drill = SpeechDrill::new(["cat", "dog", "sun", "bee"]).unwrap();
    assert!(matches!(
        drill.mark_success(&mut engine),
        Err(ActivityError::Host(SessionError::State { .. }))
    ));
    assert_eq!(drill.tally().successes, 0);
    assert_eq!(drill.power(), 0.0);

    let mut drill = SpeechDrill::new(["cat", "dog", "sun", "bee", "owl"]).unwrap();
    assert!(drill.mark_success(&mut engine).is_err());
    assert_eq!(drill.tally().successes, 0);
    assert_eq!(drill.power(), 0.0);
}
