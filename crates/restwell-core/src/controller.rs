//! The owner of the one active session.
//!
//! `SessionController` wraps a `SessionState` with everything around it:
//! debounced persistence, the widget projection, the sticky notification,
//! cues and the command mailbox. It is constructed once per process and
//! passed to whatever drives it (the CLI, the run loop, tests).

use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::feedback::{self, Feedback, FeedbackConfig, SilentFeedback};
use crate::history::{HistoryRecord, HistoryStore};
use crate::persistence::{self, DebouncedWriter};
use crate::routine::{Exercise, RoutineStore};
use crate::session::SessionState;
use crate::storage::{Config, Database, NotificationsConfig, PreferenceStore};
use crate::surface::{
    command, projection, Command, HomeSummary, NotificationPayload, Notifier, NullNotifier,
    SessionProjection, ALERT_NOTIFICATION_ID, STICKY_NOTIFICATION_ID,
};
use crate::timer::{Tick, TimerMode};

/// Window the home summary counts sessions over.
const SUMMARY_WINDOW_DAYS: i64 = 30;

/// Runtime settings for a session, derived from `Config`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub fallback_rest_secs: u64,
    pub notifications: NotificationsConfig,
    pub feedback: FeedbackConfig,
    pub monthly_goal: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Config::default().session()
    }
}

/// The stores a session reads from and writes to.
#[derive(Clone)]
pub struct Stores {
    pub routines: Rc<dyn RoutineStore>,
    pub history: Rc<dyn HistoryStore>,
    pub prefs: Rc<dyn PreferenceStore>,
}

impl Stores {
    /// All three backed by one database.
    pub fn from_database(db: Rc<Database>) -> Self {
        Self {
            routines: db.clone(),
            history: db.clone(),
            prefs: db,
        }
    }
}

/// Device-facing outputs.
pub struct Surfaces {
    pub notifier: Box<dyn Notifier>,
    pub feedback: Box<dyn Feedback>,
}

impl Surfaces {
    pub fn headless() -> Self {
        Self {
            notifier: Box::new(NullNotifier),
            feedback: Box::new(SilentFeedback),
        }
    }
}

/// A user-initiated transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CompleteSet,
    /// Skip the remaining sets of the current exercise.
    CompleteExercise,
    LogSet {
        reps: Option<String>,
        weight: Option<f64>,
    },
    ToggleTimer,
    ResetTimer,
    AdjustTimer(i64),
    SwitchMode(TimerMode),
    JumpTo(usize),
    AddExercise(Exercise),
    DeleteExercise(usize),
    DeleteSet(usize),
    /// Write history and end the session.
    Finish,
    /// End the session without writing history.
    Cancel,
}

impl From<Command> for Action {
    fn from(command: Command) -> Self {
        match command {
            Command::Pause => Action::ToggleTimer,
            Command::Reset => Action::ResetTimer,
            Command::Next => Action::CompleteSet,
        }
    }
}

pub struct SessionController {
    stores: Stores,
    surfaces: Surfaces,
    clock: Rc<dyn Clock>,
    config: SessionConfig,
    state: Option<SessionState>,
    /// Wall-clock instant the timer value is exact at. Moves only by whole
    /// consumed seconds while running; reset whenever the timer changes.
    synced_at: DateTime<Utc>,
    writer: DebouncedWriter,
    events: Vec<Event>,
}

impl SessionController {
    /// Resume the stored session for `routine_id`, or start a fresh one.
    ///
    /// A countdown that ran out while the process was away fires its finish
    /// signal here, and the result is written through immediately so a
    /// second open does not fire it again.
    ///
    /// # Errors
    /// Returns an error when a fresh start can not read the routine.
    pub fn open(
        stores: Stores,
        surfaces: Surfaces,
        clock: Rc<dyn Clock>,
        config: SessionConfig,
        routine_id: i64,
    ) -> Result<Self> {
        let now = clock.now();
        let restored = persistence::rehydrate(
            stores.prefs.as_ref(),
            stores.routines.as_ref(),
            routine_id,
            now,
            config.fallback_rest_secs,
        );

        let window = ChronoDuration::from_std(config.debounce).unwrap_or(ChronoDuration::seconds(1));
        let mut controller = Self {
            stores,
            surfaces,
            clock,
            config,
            state: None,
            synced_at: now,
            writer: DebouncedWriter::new(window),
            events: Vec::new(),
        };

        match restored {
            Some(restored) => {
                let state = restored.state;
                info!(
                    session_id = %state.session_id(),
                    routine_id,
                    elapsed_secs = restored.elapsed_secs,
                    "session restored"
                );
                controller.events.push(Event::SessionRestored {
                    session_id: state.session_id(),
                    exercise_index: state.exercise_index(),
                    set_index: state.set_index(),
                    elapsed_secs: restored.elapsed_secs,
                });
                controller.state = Some(state);
                controller.synced_at = restored.synced_at;
                if restored.finished {
                    controller.on_finished(true);
                    controller.flush();
                } else {
                    controller.push_surfaces();
                }
            }
            None => {
                if let Ok(Some(stored)) =
                    persistence::active_routine_id(controller.stores.prefs.as_ref())
                {
                    if stored != routine_id {
                        info!(stored, routine_id, "replacing stored session for another routine");
                    }
                }
                let state = SessionState::start(
                    controller.stores.routines.as_ref(),
                    routine_id,
                    controller.config.fallback_rest_secs,
                )?;
                info!(
                    session_id = %state.session_id(),
                    routine_id,
                    routine = state.routine_name(),
                    "session started"
                );
                controller.events.push(Event::SessionStarted {
                    session_id: state.session_id(),
                    routine_id,
                    routine_name: state.routine_name().to_string(),
                    exercise_count: state.exercises().len(),
                });
                controller.state = Some(state);
                controller.flush();
                controller.push_surfaces();
            }
        }
        Ok(controller)
    }

    /// Open whatever session is stored, if any.
    pub fn resume_active(
        stores: Stores,
        surfaces: Surfaces,
        clock: Rc<dyn Clock>,
        config: SessionConfig,
    ) -> Result<Option<Self>> {
        match persistence::active_routine_id(stores.prefs.as_ref())? {
            Some(routine_id) => Self::open(stores, surfaces, clock, config, routine_id).map(Some),
            None => Ok(None),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn projection(&self) -> Option<SessionProjection> {
        self.state
            .as_ref()
            .map(|s| SessionProjection::from_state(s, self.synced_at))
    }

    /// Drain the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Apply a user action. `Ok(None)` means a guard refused it or there is
    /// no active session.
    ///
    /// # Errors
    /// Only `Action::Finish` can fail, when the history store rejects the
    /// record. The session is kept so the user can retry.
    pub fn apply(&mut self, action: Action) -> Result<Option<Event>> {
        match action {
            Action::Finish => Ok(self.finalize()?.and_then(|_| self.events.last().cloned())),
            Action::Cancel => Ok(self.cancel().then(|| self.events.last().cloned()).flatten()),
            action => Ok(self.transition(action)),
        }
    }

    fn transition(&mut self, action: Action) -> Option<Event> {
        self.catch_up();
        let routines = Rc::clone(&self.stores.routines);
        let state = self.state.as_mut()?;
        let timer_before = state.timer().clone();
        let event = match action {
            Action::CompleteSet => state.complete_set(),
            Action::CompleteExercise => {
                let carry = state
                    .current()
                    .and_then(|c| c.exercise.last_rest())
                    .unwrap_or(self.config.fallback_rest_secs);
                state.complete_exercise(carry)
            }
            Action::LogSet { reps, weight } => state.log_set(reps, weight),
            Action::ToggleTimer => state.toggle_timer(),
            Action::ResetTimer => state.reset_timer(),
            Action::AdjustTimer(delta) => state.adjust_timer(delta),
            Action::SwitchMode(mode) => state.switch_timer_mode(mode),
            Action::JumpTo(index) => state.jump_to_exercise(index),
            Action::AddExercise(exercise) => state.add_exercise(routines.as_ref(), exercise),
            Action::DeleteExercise(index) => state.delete_exercise(routines.as_ref(), index),
            Action::DeleteSet(index) => state.delete_set(index),
            Action::Finish | Action::Cancel => None,
        };
        if *state.timer() != timer_before {
            self.synced_at = self.clock.now();
        }
        match event {
            Some(event) => {
                self.after_transition(event.clone());
                Some(event)
            }
            None => {
                debug!("transition refused");
                None
            }
        }
    }

    /// Called on every tick interval. The timer advances by the whole
    /// wall-clock seconds since it was last exact, so a tick that arrives
    /// late (or after the process was suspended) catches up in one step.
    pub fn on_tick(&mut self) -> Tick {
        let tick = self.catch_up();
        if let (Tick::Counted(remaining), Some(state)) = (tick, self.state.as_ref()) {
            if state.timer().mode() == TimerMode::Countdown {
                feedback::countdown_cue(
                    self.surfaces.feedback.as_ref(),
                    &self.config.feedback,
                    remaining,
                );
            }
        }
        tick
    }

    /// Fold elapsed wall-clock time into a running timer. Fires the finish
    /// signal when the countdown runs out on the way.
    fn catch_up(&mut self) -> Tick {
        let now = self.clock.now();
        let Some(state) = self.state.as_mut() else {
            return Tick::Idle;
        };
        if !state.timer().is_running() {
            self.synced_at = now;
            return Tick::Idle;
        }
        let secs = persistence::whole_secs_since(self.synced_at.timestamp_millis(), now);
        if secs == 0 {
            return Tick::Idle;
        }
        let tick = state.reconcile_timer(secs);
        self.synced_at += ChronoDuration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000));
        if secs > 1 {
            debug!(secs, "timer caught up with wall clock");
        }
        if tick == Tick::Finished {
            self.synced_at = now;
            self.on_finished(false);
        }
        tick
    }

    fn on_finished(&mut self, while_away: bool) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let name = state
            .current()
            .map(|c| c.exercise.name)
            .unwrap_or_default();
        info!(exercise = %name, while_away, "rest finished");
        let event = Event::TimerFinished {
            exercise_index: state.exercise_index(),
            set_index: state.set_index(),
            while_away,
        };

        feedback::finish_alarm(self.surfaces.feedback.as_ref(), &self.config.feedback);
        if self.config.notifications.enabled {
            let alert = NotificationPayload::rest_over(&name, &self.config.notifications.alert_channel_id);
            if let Err(e) = self.surfaces.notifier.show(&alert) {
                warn!(error = %e, "rest alert notification failed");
            }
        }
        self.after_transition(event);
    }

    /// Check the mailbox once and dispatch what is there.
    pub fn poll_commands(&mut self) -> Option<Event> {
        if self.state.is_none() {
            return None;
        }
        let command = command::take(self.stores.prefs.as_ref())?;
        self.dispatch_command(command)
    }

    /// A button press on the notification.
    pub fn handle_notification_action(&mut self, action_id: &str) -> Option<Event> {
        match Command::from_action(action_id) {
            Some(command) => self.dispatch_command(command),
            None => {
                debug!(action_id, "ignoring unknown notification action");
                None
            }
        }
    }

    fn dispatch_command(&mut self, command: Command) -> Option<Event> {
        info!(%command, "command received");
        self.events.push(Event::CommandReceived { command });
        self.transition(command.into())
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the snapshot if the debounce window has closed.
    pub fn flush_if_due(&mut self) -> bool {
        match self.state.as_ref() {
            Some(state) => {
                self.writer.flush_if_due(
                    self.stores.prefs.as_ref(),
                    state,
                    self.synced_at,
                    self.clock.now(),
                )
            }
            None => false,
        }
    }

    /// Write the snapshot now.
    pub fn flush(&mut self) {
        if let Some(state) = self.state.as_ref() {
            self.writer.flush(
                self.stores.prefs.as_ref(),
                state,
                self.synced_at,
                self.clock.now(),
            );
        }
    }

    pub fn has_pending_write(&self) -> bool {
        self.writer.is_dirty()
    }

    // ── Ending ───────────────────────────────────────────────────────

    /// Write the history record and end the session. Returns `None` when no
    /// session is active.
    ///
    /// # Errors
    /// Returns an error if the history append fails; the session stays
    /// active and persisted.
    pub fn finalize(&mut self) -> Result<Option<HistoryRecord>> {
        let Some(state) = self.state.as_ref() else {
            return Ok(None);
        };
        let now = self.clock.now();
        let mut record = state.history_record(now);
        let history_id = self.stores.history.append(&record)?;
        record.id = Some(history_id);
        info!(
            session_id = %state.session_id(),
            history_id,
            name = %record.name,
            "session finalized"
        );
        self.events.push(Event::SessionFinalized {
            history_id,
            name: record.name.clone(),
            details: record.details.len(),
        });

        self.publish_home_summary(now);
        self.state = None;
        self.teardown();
        Ok(Some(record))
    }

    /// Discard the session without writing history. Safe to call again;
    /// returns whether a session was active.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.state.take();
        if let Some(state) = &cancelled {
            info!(session_id = %state.session_id(), "session cancelled");
            self.events.push(Event::SessionCancelled {
                session_id: state.session_id(),
            });
        }
        self.teardown();
        cancelled.is_some()
    }

    fn teardown(&mut self) {
        self.writer.discard();
        let prefs = self.stores.prefs.as_ref();
        if let Err(e) = persistence::clear(prefs) {
            warn!(error = %e, "could not clear session snapshot");
        }
        if let Err(e) = projection::publish(prefs, None) {
            warn!(error = %e, "could not clear session projection");
        }
        if let Err(e) = command::clear(prefs) {
            warn!(error = %e, "could not clear command mailbox");
        }
        for id in [STICKY_NOTIFICATION_ID, ALERT_NOTIFICATION_ID] {
            if let Err(e) = self.surfaces.notifier.cancel(id) {
                warn!(error = %e, id, "could not cancel notification");
            }
        }
    }

    fn publish_home_summary(&self, now: chrono::DateTime<chrono::Utc>) {
        let since = now - ChronoDuration::days(SUMMARY_WINDOW_DAYS);
        let count = match self.stores.history.count_since(since) {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "could not count recent sessions");
                return;
            }
        };
        let summary = HomeSummary {
            count,
            goal: self.config.monthly_goal,
        };
        if let Err(e) = projection::publish_home_summary(self.stores.prefs.as_ref(), summary) {
            warn!(error = %e, "could not publish home summary");
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn after_transition(&mut self, event: Event) {
        debug!(?event, "transition");
        self.events.push(event);
        self.writer.mark_dirty(self.clock.now());
        self.push_surfaces();
    }

    fn push_surfaces(&self) {
        let Some(status) = self.projection() else {
            return;
        };
        if let Err(e) = projection::publish(self.stores.prefs.as_ref(), Some(&status)) {
            warn!(error = %e, "could not publish session projection");
        }
        if self.config.notifications.enabled {
            let sticky =
                NotificationPayload::sticky(&status, &self.config.notifications.ticker_channel_id);
            if let Err(e) = self.surfaces.notifier.show(&sticky) {
                warn!(error = %e, "status notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::routine::FREE_ROUTINE_ID;
    use crate::storage::MemoryPreferences;
    use chrono::{TimeZone, Utc};

    fn fixture() -> (Stores, Rc<ManualClock>, i64) {
        let db = Rc::new(Database::open_memory().unwrap());
        let rid = db.create_routine("Push").unwrap();
        db.add_exercise(rid, &Exercise::new("Bench", vec![90, 90])).unwrap();
        db.add_exercise(rid, &Exercise::new("Dips", vec![60])).unwrap();
        let clock = Rc::new(ManualClock::at(
            Utc.with_ymd_and_hms(2026, 4, 2, 18, 0, 0).unwrap(),
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

    #[test]
    fn fresh_open_persists_immediately() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        assert!(matches!(
            controller.take_events().as_slice(),
            [Event::SessionStarted { exercise_count: 2, .. }]
        ));
        assert_eq!(
            persistence::active_routine_id(stores.prefs.as_ref()).unwrap(),
            Some(rid)
        );
        assert!(projection::load(stores.prefs.as_ref()).is_some());
    }

    #[test]
    fn transitions_are_debounced() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteSet).unwrap();
        assert!(controller.has_pending_write());
        assert!(!controller.flush_if_due());
        clock.advance_secs(1);
        assert!(controller.flush_if_due());
        let snapshot = persistence::load_snapshot(stores.prefs.as_ref()).unwrap();
        assert_eq!(snapshot.set_index, 1);
        assert!(snapshot.running);
    }

    #[test]
    fn reopen_resumes_same_session() {
        let (stores, clock, rid) = fixture();
        let mut first = open(&stores, &clock, rid);
        let id = first.state().unwrap().session_id();
        first.apply(Action::CompleteSet).unwrap();
        first.flush();

        clock.advance_secs(30);
        let second = open(&stores, &clock, rid);
        let state = second.state().unwrap();
        assert_eq!(state.session_id(), id);
        assert_eq!(state.set_index(), 1);
        assert_eq!(state.timer().value_secs(), 60);
        assert!(state.timer().is_running());
    }

    #[test]
    fn mailbox_next_completes_a_set() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        command::post(stores.prefs.as_ref(), Command::Next).unwrap();
        assert!(matches!(
            controller.poll_commands(),
            Some(Event::SetCompleted { set_index: 0, .. })
        ));
        assert_eq!(controller.poll_commands(), None);
    }

    #[test]
    fn notification_actions_dispatch() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        assert!(matches!(
            controller.handle_notification_action("PAUSE_TIMER"),
            Some(Event::TimerToggled { running: true, .. })
        ));
        assert_eq!(controller.handle_notification_action("SNOOZE"), None);
    }

    #[test]
    fn tick_to_zero_fires_finish_once() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteSet).unwrap();
        controller.take_events();
        for _ in 0..89 {
            clock.advance_secs(1);
            assert!(matches!(controller.on_tick(), Tick::Counted(_)));
        }
        clock.advance_secs(1);
        assert_eq!(controller.on_tick(), Tick::Finished);
        clock.advance_secs(1);
        assert_eq!(controller.on_tick(), Tick::Idle);
        let finished = controller
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, Event::TimerFinished { .. }))
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn tick_without_a_whole_second_does_nothing() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteSet).unwrap();
        clock.advance(ChronoDuration::milliseconds(600));
        assert_eq!(controller.on_tick(), Tick::Idle);
        clock.advance(ChronoDuration::milliseconds(600));
        assert_eq!(controller.on_tick(), Tick::Counted(89));
    }

    #[test]
    fn late_tick_catches_up_with_wall_clock() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteSet).unwrap();
        controller.flush();

        clock.advance_secs(30);
        assert_eq!(controller.on_tick(), Tick::Counted(60));
        controller.flush();
        drop(controller);

        let restored = open(&stores, &clock, rid);
        assert_eq!(restored.state().unwrap().timer().value_secs(), 60);
    }

    #[test]
    fn late_tick_past_zero_finishes_once() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteSet).unwrap();
        controller.take_events();

        clock.advance_secs(300);
        assert_eq!(controller.on_tick(), Tick::Finished);
        clock.advance_secs(1);
        assert_eq!(controller.on_tick(), Tick::Idle);
        let events = controller.take_events();
        assert!(matches!(
            events.as_slice(),
            [Event::TimerFinished { while_away: false, .. }]
        ));
    }

    #[test]
    fn transitions_count_elapsed_time_first() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteSet).unwrap();
        clock.advance_secs(10);
        assert!(matches!(
            controller.apply(Action::ToggleTimer).unwrap(),
            Some(Event::TimerToggled { running: false, value_secs: 80 })
        ));
    }

    #[test]
    fn finalize_writes_history_and_home_summary() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        controller.apply(Action::CompleteExercise).unwrap();
        let record = controller.finalize().unwrap().unwrap();
        assert_eq!(record.name, crate::history::SESSION_ENDED);
        assert_eq!(record.set_count, 2);
        assert_eq!(record.details.len(), 1);

        let summary = stores.prefs.get(projection::HOME_SUMMARY_KEY).unwrap().unwrap();
        let summary: HomeSummary = serde_json::from_str(&summary).unwrap();
        assert_eq!(summary, HomeSummary { count: 1, goal: 12 });
        assert!(persistence::load_snapshot(stores.prefs.as_ref()).is_none());
        assert!(!controller.is_active());
        assert_eq!(controller.finalize().unwrap(), None);
    }

    #[test]
    fn failed_history_append_keeps_session() {
        struct BrokenHistory;
        impl HistoryStore for BrokenHistory {
            fn append(&self, _record: &HistoryRecord) -> Result<i64> {
                Err(crate::error::CoreError::Custom("disk full".into()))
            }
            fn count_since(&self, _since: chrono::DateTime<Utc>) -> Result<u64> {
                Ok(0)
            }
        }

        let (mut stores, clock, _) = fixture();
        stores.history = Rc::new(BrokenHistory);
        let mut controller = open(&stores, &clock, FREE_ROUTINE_ID);
        assert!(controller.finalize().is_err());
        assert!(controller.is_active());
        assert!(persistence::load_record(stores.prefs.as_ref()).is_some());
    }

    #[test]
    fn cancel_twice_is_harmless() {
        let (stores, clock, rid) = fixture();
        let mut controller = open(&stores, &clock, rid);
        assert!(controller.cancel());
        assert!(!controller.cancel());
        assert!(persistence::load_snapshot(stores.prefs.as_ref()).is_none());
        assert!(projection::load(stores.prefs.as_ref()).is_none());
    }

    #[test]
    fn resume_active_without_session_is_none() {
        let stores = Stores {
            prefs: Rc::new(MemoryPreferences::new()),
            ..fixture().0
        };
        let clock = Rc::new(ManualClock::at(Utc::now()));
        let resumed = SessionController::resume_active(
            stores,
            Surfaces::headless(),
            clock,
            SessionConfig::default(),
        )
        .unwrap();
        assert!(resumed.is_none());
    }

    #[test]
    fn resume_active_reports_unreadable_store() {
        struct Unreadable;
        impl PreferenceStore for Unreadable {
            fn get(&self, _key: &str) -> Result<Option<String>> {
                Err(crate::error::CoreError::Custom("database is locked".into()))
            }
            fn set(&self, _key: &str, _value: &str) -> Result<()> {
                Ok(())
            }
            fn remove(&self, _key: &str) -> Result<()> {
                Ok(())
            }
        }

        let stores = Stores {
            prefs: Rc::new(Unreadable),
            ..fixture().0
        };
        let clock = Rc::new(ManualClock::at(Utc::now()));
        let resumed = SessionController::resume_active(
            stores,
            Surfaces::headless(),
            clock,
            SessionConfig::default(),
        );
        assert!(resumed.is_err());
    }
}
