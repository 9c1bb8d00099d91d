//! Timer engine implementation.
//!
//! The timer engine is a logical-second state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` once
//! per wall-clock second while the timer runs. Wall-clock gaps (process
//! suspended, snapshot restored) are folded in with `reconcile()`.
//!
//! ## State Transitions
//!
//! ```text
//! Paused <-> Running -> (countdown reaches zero) -> Paused + Finished
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::countdown(90);
//! engine.start();
//! // Once per second:
//! if engine.tick() == Tick::Finished { /* rest is over */ }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Rest countdown between sets.
    Countdown,
    /// Free-running count-up.
    Stopwatch,
}

/// The clock value, tagged by mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TimerClock {
    Countdown {
        remaining_secs: u64,
        duration_secs: u64,
    },
    Stopwatch {
        elapsed_secs: u64,
    },
}

impl TimerClock {
    pub fn mode(&self) -> TimerMode {
        match self {
            TimerClock::Countdown { .. } => TimerMode::Countdown,
            TimerClock::Stopwatch { .. } => TimerMode::Stopwatch,
        }
    }

    /// Seconds shown on the display: remaining for a countdown, elapsed for a stopwatch.
    pub fn value_secs(&self) -> u64 {
        match *self {
            TimerClock::Countdown { remaining_secs, .. } => remaining_secs,
            TimerClock::Stopwatch { elapsed_secs } => elapsed_secs,
        }
    }
}

/// Outcome of a `tick()` or `reconcile()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer is paused; nothing happened.
    Idle,
    /// Value moved; carries the new display value.
    Counted(u64),
    /// Countdown reached zero on this call. The engine has stopped itself.
    Finished,
}

/// Core timer engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEngine {
    clock: TimerClock,
    running: bool,
}

impl TimerEngine {
    /// A paused countdown loaded with `duration_secs`.
    pub fn countdown(duration_secs: u64) -> Self {
        Self {
            clock: TimerClock::Countdown {
                remaining_secs: duration_secs,
                duration_secs,
            },
            running: false,
        }
    }

    /// A paused stopwatch at zero.
    pub fn stopwatch() -> Self {
        Self {
            clock: TimerClock::Stopwatch { elapsed_secs: 0 },
            running: false,
        }
    }

    /// Rebuild an engine from persisted parts.
    pub fn from_parts(clock: TimerClock, running: bool) -> Self {
        Self { clock, running }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn clock(&self) -> TimerClock {
        self.clock
    }

    pub fn mode(&self) -> TimerMode {
        self.clock.mode()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn value_secs(&self) -> u64 {
        self.clock.value_secs()
    }

    /// Configured rest length; zero for a stopwatch.
    pub fn duration_secs(&self) -> u64 {
        match self.clock {
            TimerClock::Countdown { duration_secs, .. } => duration_secs,
            TimerClock::Stopwatch { .. } => 0,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Reset to a fresh rest period or a zeroed stopwatch. Leaves the timer paused.
    pub fn configure(&mut self, mode: TimerMode, duration_secs: u64) {
        *self = match mode {
            TimerMode::Countdown => Self::countdown(duration_secs),
            TimerMode::Stopwatch => Self::stopwatch(),
        };
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Flip running/paused. The stored value is untouched.
    pub fn toggle(&mut self) -> bool {
        self.running = !self.running;
        self.running
    }

    /// Back to the configured duration (countdown) or zero (stopwatch), paused.
    pub fn reset(&mut self) {
        self.running = false;
        match &mut self.clock {
            TimerClock::Countdown {
                remaining_secs,
                duration_secs,
            } => *remaining_secs = *duration_secs,
            TimerClock::Stopwatch { elapsed_secs } => *elapsed_secs = 0,
        }
    }

    /// Shift the current value. A countdown never drops below one second so
    /// an adjustment can not finish it; a stopwatch clamps at zero.
    pub fn adjust(&mut self, delta_secs: i64) -> u64 {
        match &mut self.clock {
            TimerClock::Countdown { remaining_secs, .. } => {
                *remaining_secs = shift(*remaining_secs, delta_secs).max(1);
                *remaining_secs
            }
            TimerClock::Stopwatch { elapsed_secs } => {
                *elapsed_secs = shift(*elapsed_secs, delta_secs);
                *elapsed_secs
            }
        }
    }

    /// Advance one logical second.
    pub fn tick(&mut self) -> Tick {
        self.advance(1)
    }

    /// Fold `elapsed_secs` of wall-clock time into a running timer.
    pub fn reconcile(&mut self, elapsed_secs: u64) -> Tick {
        self.advance(elapsed_secs)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn advance(&mut self, secs: u64) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        match &mut self.clock {
            TimerClock::Countdown { remaining_secs, .. } => {
                *remaining_secs = remaining_secs.saturating_sub(secs);
                if *remaining_secs == 0 {
                    self.running = false;
                    Tick::Finished
                } else {
                    Tick::Counted(*remaining_secs)
                }
            }
            TimerClock::Stopwatch { elapsed_secs } => {
                *elapsed_secs = elapsed_secs.saturating_add(secs);
                Tick::Counted(*elapsed_secs)
            }
        }
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::countdown(0)
    }
}

fn shift(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_finishes_once_and_stops() {
        let mut engine = TimerEngine::countdown(2);
        engine.start();
        assert_eq!(engine.tick(), Tick::Counted(1));
        assert_eq!(engine.tick(), Tick::Finished);
        assert!(!engine.is_running());
        assert_eq!(engine.tick(), Tick::Idle);
        assert_eq!(engine.value_secs(), 0);
    }

    #[test]
    fn paused_timer_does_not_move() {
        let mut engine = TimerEngine::countdown(30);
        assert_eq!(engine.tick(), Tick::Idle);
        assert_eq!(engine.value_secs(), 30);
    }

    #[test]
    fn toggle_keeps_value() {
        let mut engine = TimerEngine::countdown(30);
        engine.start();
        engine.tick();
        assert!(!engine.toggle());
        assert_eq!(engine.value_secs(), 29);
        assert!(engine.toggle());
        assert_eq!(engine.value_secs(), 29);
    }

    #[test]
    fn stopwatch_counts_up() {
        let mut engine = TimerEngine::stopwatch();
        engine.start();
        engine.tick();
        engine.tick();
        assert_eq!(engine.value_secs(), 2);
        assert_eq!(engine.duration_secs(), 0);
    }

    #[test]
    fn adjust_clamps_per_mode() {
        let mut countdown = TimerEngine::countdown(20);
        assert_eq!(countdown.adjust(-30), 1);
        assert_eq!(countdown.adjust(10), 11);

        let mut stopwatch = TimerEngine::stopwatch();
        assert_eq!(stopwatch.adjust(-10), 0);
        assert_eq!(stopwatch.adjust(30), 30);
    }

    #[test]
    fn adjust_after_finish_does_not_refire() {
        let mut engine = TimerEngine::countdown(1);
        engine.start();
        assert_eq!(engine.tick(), Tick::Finished);
        assert_eq!(engine.adjust(10), 10);
        assert!(!engine.is_running());
        assert_eq!(engine.tick(), Tick::Idle);
    }

    #[test]
    fn reset_restores_duration_and_pauses() {
        let mut engine = TimerEngine::countdown(60);
        engine.start();
        engine.reconcile(25);
        engine.reset();
        assert_eq!(engine.value_secs(), 60);
        assert!(!engine.is_running());

        let mut stopwatch = TimerEngine::stopwatch();
        stopwatch.start();
        stopwatch.reconcile(40);
        stopwatch.reset();
        assert_eq!(stopwatch.value_secs(), 0);
    }

    #[test]
    fn reconcile_past_zero_finishes() {
        let mut engine = TimerEngine::countdown(10);
        engine.start();
        assert_eq!(engine.reconcile(15), Tick::Finished);
        assert_eq!(engine.value_secs(), 0);
    }

    #[test]
    fn configure_switches_mode_paused() {
        let mut engine = TimerEngine::countdown(45);
        engine.start();
        engine.configure(TimerMode::Stopwatch, 45);
        assert_eq!(engine.mode(), TimerMode::Stopwatch);
        assert_eq!(engine.value_secs(), 0);
        assert!(!engine.is_running());
    }

    #[test]
    fn clock_serializes_with_mode_tag() {
        let json = serde_json::to_value(TimerEngine::countdown(90)).unwrap();
        assert_eq!(json["clock"]["mode"], "countdown");
        assert_eq!(json["clock"]["remaining_secs"], 90);
    }
}
