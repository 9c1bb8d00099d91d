//! Integration tests for a whole session: progression, the command
//! mailbox, the run loop and finalization.

use std::rc::Rc;
use std::time::Duration;

use chrono::Utc;
use restwell_core::history::SESSION_COMPLETE;
use restwell_core::persistence;
use restwell_core::storage::{Database, MemoryPreferences};
use restwell_core::surface::{command, projection, PreferenceNotifier, NOTIFICATION_KEY};
use restwell_core::{
    run_session, Action, Command, Event, Exercise, ManualClock, PreferenceStore, RoutineStore, SessionConfig,
    SessionController, Stores, Surfaces,
};
use tokio::sync::mpsc;

fn setup() -> (Rc<Database>, Stores, i64) {
    let db = Rc::new(Database::open_memory().unwrap());
    let rid = db.create_routine("Full Body").unwrap();
    db.add_exercise(rid, &Exercise::new("Squat", vec![120, 120]))
        .unwrap();
    db.add_exercise(rid, &Exercise::new("Press", vec![90]))
        .unwrap();
    let stores = Stores::from_database(db.clone());
    (db, stores, rid)
}

fn open(stores: &Stores, rid: i64) -> SessionController {
    SessionController::open(
        stores.clone(),
        Surfaces::headless(),
        Rc::new(ManualClock::at(Utc::now())),
        SessionConfig::default(),
        rid,
    )
    .unwrap()
}

#[test]
fn test_full_session_writes_one_history_record() {
    let (db, stores, rid) = setup();
    let mut controller = open(&stores, rid);
    for _ in 0..5 {
        controller.apply(Action::CompleteSet).unwrap();
    }
    let state = controller.state().unwrap();
    assert!(state.is_complete());
    assert_eq!(state.exercise_index(), 1);
    let accumulated = state.results().len();

    let record = controller.finalize().unwrap().unwrap();
    assert_eq!(record.name, SESSION_COMPLETE);
    assert_eq!(record.set_count, 2);
    assert_eq!(record.details.len(), accumulated);

    let history = db.history(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].routine_name, "Full Body");

    assert_eq!(controller.finalize().unwrap(), None);
    assert_eq!(db.history(10).unwrap().len(), 1);
}

#[test]
fn test_cancel_twice_leaves_nothing_behind() {
    let (db, stores, rid) = setup();
    let mut controller = open(&stores, rid);
    controller.apply(Action::CompleteSet).unwrap();
    controller.flush();
    command::post(stores.prefs.as_ref(), Command::Pause).unwrap();

    assert!(controller.cancel());
    assert!(!controller.cancel());
    let prefs = stores.prefs.as_ref();
    assert!(persistence::load_snapshot(prefs).is_none());
    assert!(persistence::load_record(prefs).is_none());
    assert!(projection::load(prefs).is_none());
    assert!(prefs.get(command::COMMAND_KEY).unwrap().is_none());
    assert!(db.history(10).unwrap().is_empty());
}

#[test]
fn test_delete_on_single_exercise_is_rejected() {
    let db = Rc::new(Database::open_memory().unwrap());
    let rid = db.create_routine("Solo").unwrap();
    db.add_exercise(rid, &Exercise::new("Deadlift", vec![180]))
        .unwrap();
    let stores = Stores::from_database(db);
    let mut controller = open(&stores, rid);

    assert_eq!(controller.apply(Action::DeleteExercise(0)).unwrap(), None);
    let state = controller.state().unwrap();
    assert_eq!(state.exercise_names(), vec!["Deadlift"]);
    assert_eq!((state.exercise_index(), state.set_index()), (0, 0));
}

#[test]
fn test_add_then_delete_round_trip() {
    let (_db, stores, rid) = setup();
    let mut controller = open(&stores, rid);
    let before = controller.state().unwrap().exercise_names();
    controller
        .apply(Action::AddExercise(Exercise::new("Lunge", vec![60])))
        .unwrap();
    let index = controller.state().unwrap().exercise_index();
    controller.apply(Action::DeleteExercise(index)).unwrap();
    assert_eq!(controller.state().unwrap().exercise_names(), before);
}

#[test]
fn test_notifications_follow_the_session() {
    let (_db, stores, rid) = setup();
    let prefs: Rc<dyn PreferenceStore> = Rc::new(MemoryPreferences::new());
    let stores = Stores {
        prefs: prefs.clone(),
        ..stores
    };
    let surfaces = Surfaces {
        notifier: Box::new(PreferenceNotifier::new(prefs.clone())),
        ..Surfaces::headless()
    };
    let mut controller = SessionController::open(
        stores,
        surfaces,
        Rc::new(ManualClock::at(Utc::now())),
        SessionConfig::default(),
        rid,
    )
    .unwrap();
    controller.apply(Action::CompleteSet).unwrap();

    let raw = prefs.get(NOTIFICATION_KEY).unwrap().unwrap();
    assert!(raw.contains("Workout: Squat"));
    assert!(raw.contains("Set 2 | Resting"));

    controller.cancel();
    assert!(prefs.get(NOTIFICATION_KEY).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_next_command_is_consumed_within_one_poll() {
    let (_db, stores, rid) = setup();
    let mut controller = open(&stores, rid);
    let poll = controller.config().poll_interval;
    let (tx, rx) = mpsc::channel(4);
    let prefs = stores.prefs.clone();
    let mut events = Vec::new();

    let driver = async {
        command::post(prefs.as_ref(), Command::Next).unwrap();
        tokio::time::sleep(poll + Duration::from_millis(1)).await;
        assert!(prefs.get(command::COMMAND_KEY).unwrap().is_none());
        drop(tx);
    };
    tokio::join!(
        run_session(&mut controller, rx, |e| events.push(e.clone())),
        driver
    );

    assert!(events
        .iter()
        .any(|e| matches!(e, Event::CommandReceived { command: Command::Next })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SetCompleted { set_index: 0, .. })));
    assert_eq!(controller.state().unwrap().set_index(), 1);
    assert!(!controller.has_pending_write());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_ends_on_finish() {
    let (db, stores, rid) = setup();
    let mut controller = open(&stores, rid);
    let (tx, rx) = mpsc::channel(4);
    tx.send(Action::CompleteSet).await.unwrap();
    tx.send(Action::Finish).await.unwrap();

    let mut finalized = 0;
    run_session(&mut controller, rx, |e| {
        if matches!(e, Event::SessionFinalized { .. }) {
            finalized += 1;
        }
    })
    .await;

    assert_eq!(finalized, 1);
    assert!(!controller.is_active());
    assert_eq!(db.history(10).unwrap().len(), 1);
    drop(tx);
}
