//! Integration tests for session persistence across process restarts.
//!
//! Each "restart" opens a new controller over the same database and a
//! manual clock that has moved on.

use std::rc::Rc;

use chrono::{Duration, TimeZone, Utc};
use restwell_core::persistence::{self, RECORD_KEY, SNAPSHOT_KEY};
use restwell_core::storage::Database;
use restwell_core::{
    Action, Event, Exercise, ManualClock, PreferenceStore, RoutineStore, SessionConfig,
    SessionController, Stores, Surfaces, TimerMode, FREE_ROUTINE_ID,
};

fn setup() -> (Stores, Rc<ManualClock>, i64) {
    let db = Rc::new(Database::open_memory().unwrap());
    let rid = db.create_routine("Pull").unwrap();
    db.add_exercise(rid, &Exercise::new("Row", vec![90, 90])).unwrap();
    db.add_exercise(rid, &Exercise::new("Curl", vec![60])).unwrap();
    let clock = Rc::new(ManualClock::at(
        Utc.with_ymd_and_hms(2026, 6, 1, 17, 0, 0).unwrap(),
    ));
    (Stores::from_database(db), clock, rid)
}

fn open(stores: &Stores, clock: &Rc<ManualClock>, rid: i64) -> SessionController {
    SessionController::open(
        stores.clone(),
        Surfaces::headless(),
        clock.clone(),
        SessionConfig::default(),
        rid,
    )
    .unwrap()
}

fn finish_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::TimerFinished { .. }))
        .count()
}

#[test]
fn test_countdown_expired_while_away_finishes_once() {
    let (stores, clock, rid) = setup();
    let mut controller = open(&stores, &clock, rid);
    controller.apply(Action::CompleteSet).unwrap();
    for _ in 0..80 {
        clock.advance_secs(1);
        controller.on_tick();
    }
    assert_eq!(controller.state().unwrap().timer().value_secs(), 10);
    controller.flush();
    drop(controller);

    clock.advance_secs(15);
    let mut restored = open(&stores, &clock, rid);
    let events = restored.take_events();
    assert!(matches!(
        events.as_slice(),
        [
            Event::SessionRestored { elapsed_secs: 15, .. },
            Event::TimerFinished { while_away: true, .. }
        ]
    ));
    let timer = restored.state().unwrap().timer();
    assert_eq!(timer.value_secs(), 0);
    assert!(!timer.is_running());
    drop(restored);

    let mut again = open(&stores, &clock, rid);
    assert_eq!(finish_count(&again.take_events()), 0);
    assert_eq!(again.state().unwrap().timer().value_secs(), 0);
}

#[test]
fn test_stopwatch_accumulates_elapsed_time() {
    let (stores, clock, rid) = setup();
    let mut controller = open(&stores, &clock, rid);
    controller.apply(Action::SwitchMode(TimerMode::Stopwatch)).unwrap();
    controller.apply(Action::ToggleTimer).unwrap();
    for _ in 0..5 {
        clock.advance_secs(1);
        controller.on_tick();
    }
    controller.flush();

    clock.advance_secs(20);
    let restored = open(&stores, &clock, rid);
    let timer = restored.state().unwrap().timer();
    assert_eq!(timer.mode(), TimerMode::Stopwatch);
    assert_eq!(timer.value_secs(), 25);
    assert!(timer.is_running());
}

#[test]
fn test_paused_timer_is_restored_unchanged() {
    let (stores, clock, rid) = setup();
    let mut controller = open(&stores, &clock, rid);
    controller.apply(Action::AdjustTimer(-30)).unwrap();
    controller.flush();

    clock.advance_secs(3600);
    let restored = open(&stores, &clock, rid);
    let timer = restored.state().unwrap().timer();
    assert_eq!(timer.value_secs(), 60);
    assert!(!timer.is_running());
}

#[test]
fn test_session_edits_survive_restart() {
    let (stores, clock, rid) = setup();
    let mut controller = open(&stores, &clock, rid);
    controller
        .apply(Action::AddExercise(Exercise::new("Shrug", vec![45])))
        .unwrap();
    controller.apply(Action::DeleteExercise(0)).unwrap();
    controller
        .apply(Action::LogSet {
            reps: Some("15".into()),
            weight: Some(40.0),
        })
        .unwrap();
    controller.flush();

    let restored = open(&stores, &clock, rid);
    let state = restored.state().unwrap();
    assert_eq!(state.exercise_names(), vec!["Curl", "Shrug"]);
    assert_eq!(state.exercise_index(), 1);
    assert_eq!(state.set_entries(1)[0].weight, Some(40.0));
    // The routine itself never saw the edits.
    assert_eq!(stores.routines.exercises(rid).unwrap().len(), 2);
}

#[test]
fn test_malformed_state_starts_fresh() {
    let (stores, clock, rid) = setup();
    stores.prefs.set(RECORD_KEY, "{not json").unwrap();
    stores.prefs.set(SNAPSHOT_KEY, "[]").unwrap();

    let mut controller = open(&stores, &clock, rid);
    assert!(matches!(
        controller.take_events().as_slice(),
        [Event::SessionStarted { .. }]
    ));
    assert_eq!((controller.state().unwrap().exercise_index(), controller.state().unwrap().set_index()), (0, 0));
    assert!(persistence::load_record(stores.prefs.as_ref()).is_some());
}

#[test]
fn test_other_routine_is_not_rehydrated() {
    let (stores, clock, rid) = setup();
    let mut first = open(&stores, &clock, rid);
    first.apply(Action::CompleteSet).unwrap();
    first.flush();

    let other = open(&stores, &clock, FREE_ROUTINE_ID);
    assert!(other.state().unwrap().is_free());
    assert_eq!(
        persistence::active_routine_id(stores.prefs.as_ref()).unwrap(),
        Some(FREE_ROUTINE_ID)
    );
}

#[test]
fn test_free_session_only_restores_its_own_exercises() {
    let (stores, clock, _) = setup();
    stores
        .routines
        .add_exercise(FREE_ROUTINE_ID, &Exercise::new("Leftover", vec![30]))
        .unwrap();

    let mut controller = open(&stores, &clock, FREE_ROUTINE_ID);
    controller
        .apply(Action::AddExercise(Exercise::new("Burpee", vec![20])))
        .unwrap();
    controller.flush();

    let restored = open(&stores, &clock, FREE_ROUTINE_ID);
    assert_eq!(restored.state().unwrap().exercise_names(), vec!["Burpee"]);
}

#[test]
fn test_reopening_every_invocation_keeps_sub_second_progress() {
    let (stores, clock, rid) = setup();
    let mut controller = open(&stores, &clock, rid);
    controller.apply(Action::CompleteSet).unwrap();
    controller.flush();
    drop(controller);

    // One open-apply-flush cycle per command, faster than once a second.
    for i in 0..20 {
        clock.advance(Duration::milliseconds(900));
        let mut controller = open(&stores, &clock, rid);
        if i % 5 == 0 {
            controller
                .apply(Action::LogSet {
                    reps: Some("8".into()),
                    weight: None,
                })
                .unwrap();
        }
        controller.flush();
    }

    let restored = open(&stores, &clock, rid);
    let timer = restored.state().unwrap().timer();
    assert!(timer.is_running());
    assert_eq!(timer.value_secs(), 90 - 18);
}

#[test]
fn test_suspended_loop_catches_up_on_first_tick() {
    let (stores, clock, rid) = setup();
    let mut controller = open(&stores, &clock, rid);
    controller.apply(Action::CompleteSet).unwrap();
    controller.flush();

    // The process sleeps; the interval fires once on wake.
    clock.advance_secs(30);
    controller.on_tick();
    assert_eq!(controller.state().unwrap().timer().value_secs(), 60);
    controller.flush();
    drop(controller);

    let restored = open(&stores, &clock, rid);
    assert_eq!(restored.state().unwrap().timer().value_secs(), 60);

    clock.advance(Duration::milliseconds(1500));
    let again = open(&stores, &clock, rid);
    assert_eq!(again.state().unwrap().timer().value_secs(), 59);
}
