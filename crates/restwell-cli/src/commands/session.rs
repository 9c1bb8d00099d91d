use std::io::{BufRead, Write};

use clap::{Subcommand, ValueEnum};
use restwell_core::error::Result as CoreResult;
use restwell_core::feedback::{Feedback, HapticPattern};
use restwell_core::{
    run_session, Action, Exercise, SessionController, SessionPhase, SessionProjection, Surfaces,
    TimerMode, FREE_ROUTINE_ID,
};
use serde::Serialize;
use tokio::sync::mpsc;

use super::{print_events, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start (or resume) a session for a routine id, or `free`
    Start {
        /// Routine id, or "free" for an unassigned workout
        routine: String,
    },
    /// Print the current session as JSON
    Status,
    /// Complete the current set and start its rest
    CompleteSet,
    /// Skip the remaining sets of the current exercise
    CompleteExercise,
    /// Record reps and/or weight for the current set
    Log {
        #[arg(long)]
        reps: Option<String>,
        #[arg(long)]
        weight: Option<f64>,
    },
    /// Start or pause the timer
    Toggle,
    /// Reset the timer to its configured duration
    Reset,
    /// Shift the timer by seconds (e.g. 15, -10), or one configured step with + / -
    Adjust {
        #[arg(allow_hyphen_values = true)]
        delta: String,
    },
    /// Switch between countdown and stopwatch
    Mode { mode: ModeArg },
    /// Go to an exercise by index
    Jump { index: usize },
    /// Add an exercise to this session
    Add {
        name: String,
        /// Rest seconds after each set but the last, e.g. 90,90
        #[arg(long, value_delimiter = ',')]
        rest: Vec<u64>,
        /// Target reps per set, e.g. 12,10,8
        #[arg(long, value_delimiter = ',')]
        reps: Vec<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Remove an exercise from this session
    DeleteExercise { index: usize },
    /// Remove a set from the current exercise
    DeleteSet { index: usize },
    /// Write the history record and end the session
    Finish,
    /// End the session without writing history
    Cancel,
    /// Run the session interactively; reads commands from stdin
    Run,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Countdown,
    Stopwatch,
}

impl From<ModeArg> for TimerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Countdown => TimerMode::Countdown,
            ModeArg::Stopwatch => TimerMode::Stopwatch,
        }
    }
}

#[derive(Serialize)]
struct StatusView {
    session_id: String,
    routine_id: i64,
    routine_name: String,
    phase: SessionPhase,
    exercise_index: usize,
    set_index: usize,
    exercises: Vec<String>,
    completed: Vec<usize>,
    running: bool,
    projection: SessionProjection,
}

fn status(controller: &SessionController) -> Option<StatusView> {
    let state = controller.state()?;
    Some(StatusView {
        session_id: state.session_id().to_string(),
        routine_id: state.routine_id(),
        routine_name: state.routine_name().to_string(),
        phase: state.phase(),
        exercise_index: state.exercise_index(),
        set_index: state.set_index(),
        exercises: state.exercise_names(),
        completed: state.completed_indices(),
        running: state.timer().is_running(),
        projection: controller.projection()?,
    })
}

fn parse_routine(routine: &str) -> Result<i64, Box<dyn std::error::Error>> {
    if routine.eq_ignore_ascii_case("free") {
        return Ok(FREE_ROUTINE_ID);
    }
    Ok(routine
        .parse()
        .map_err(|_| format!("invalid routine id: {routine}"))?)
}

fn parse_delta(delta: &str, step_secs: u64) -> Result<i64, Box<dyn std::error::Error>> {
    let step = i64::try_from(step_secs)?;
    match delta.trim() {
        "+" => Ok(step),
        "-" => Ok(-step),
        other => Ok(other
            .trim_start_matches('+')
            .parse()
            .map_err(|_| format!("invalid adjustment: {other}"))?),
    }
}

/// Apply one action to the stored session and print what happened.
fn apply(ctx: &Context, action: Action) -> CliResult {
    let mut controller = ctx.resume()?;
    let outcome = controller.apply(action);
    controller.flush();
    print_events(&controller.take_events())?;
    match outcome? {
        Some(_) => Ok(()),
        None => {
            println!("{{\"type\": \"refused\"}}");
            Ok(())
        }
    }
}

pub fn run(action: SessionAction) -> CliResult {
    let ctx = Context::open()?;

    match action {
        SessionAction::Start { routine } => {
            let mut controller = ctx.open_session(parse_routine(&routine)?)?;
            controller.flush();
            print_events(&controller.take_events())?;
            if let Some(view) = status(&controller) {
                print_json(&view)?;
            }
        }
        SessionAction::Status => {
            let mut controller = ctx.resume()?;
            controller.flush();
            if let Some(view) = status(&controller) {
                print_json(&view)?;
            }
        }
        SessionAction::CompleteSet => apply(&ctx, Action::CompleteSet)?,
        SessionAction::CompleteExercise => apply(&ctx, Action::CompleteExercise)?,
        SessionAction::Log { reps, weight } => apply(&ctx, Action::LogSet { reps, weight })?,
        SessionAction::Toggle => apply(&ctx, Action::ToggleTimer)?,
        SessionAction::Reset => apply(&ctx, Action::ResetTimer)?,
        SessionAction::Adjust { delta } => {
            let delta = parse_delta(&delta, ctx.config.timer.adjust_step_secs)?;
            apply(&ctx, Action::AdjustTimer(delta))?
        }
        SessionAction::Mode { mode } => apply(&ctx, Action::SwitchMode(mode.into()))?,
        SessionAction::Jump { index } => apply(&ctx, Action::JumpTo(index))?,
        SessionAction::Add {
            name,
            rest,
            reps,
            notes,
        } => {
            let exercise = Exercise::new(name, rest).with_reps(reps).with_notes(notes);
            apply(&ctx, Action::AddExercise(exercise))?
        }
        SessionAction::DeleteExercise { index } => apply(&ctx, Action::DeleteExercise(index))?,
        SessionAction::DeleteSet { index } => apply(&ctx, Action::DeleteSet(index))?,
        SessionAction::Finish => {
            let mut controller = ctx.resume()?;
            let record = controller.finalize()?;
            print_events(&controller.take_events())?;
            if let Some(record) = record {
                print_json(&record)?;
            }
        }
        SessionAction::Cancel => {
            // Cancelling with nothing stored is fine.
            match ctx.stored_session(ctx.surfaces())? {
                Some(mut controller) => {
                    controller.cancel();
                    print_events(&controller.take_events())?;
                }
                None => println!("{{\"type\": \"no_session\"}}"),
            }
        }
        SessionAction::Run => run_interactive(&ctx)?,
    }
    Ok(())
}

/// Stdin line to action. Accepts the mailbox vocabulary plus finish/cancel.
fn parse_line(line: &str) -> Option<Action> {
    match line.trim() {
        "finish" => Some(Action::Finish),
        "cancel" => Some(Action::Cancel),
        "toggle" => Some(Action::ToggleTimer),
        other => other.parse::<restwell_core::Command>().ok().map(Action::from),
    }
}

fn run_interactive(ctx: &Context) -> CliResult {
    let surfaces = Surfaces {
        feedback: Box::new(TerminalFeedback),
        ..ctx.surfaces()
    };
    let mut controller = ctx.resume_with(surfaces)?;
    let (tx, rx) = mpsc::channel(16);

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Some(action) => {
                    if tx.blocking_send(action).is_err() {
                        break;
                    }
                }
                None => eprintln!("unknown input: {line} (next|pause|reset|toggle|finish|cancel)"),
            }
        }
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(run_session(&mut controller, rx, |event| {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
    }));
    Ok(())
}

/// Terminal bell for cues; spoken cues are printed to stderr.
struct TerminalFeedback;

impl Feedback for TerminalFeedback {
    fn beep(&self) -> CoreResult<()> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }

    fn speak(&self, text: &str) -> CoreResult<()> {
        eprintln!("{text}");
        Ok(())
    }

    fn haptic(&self, _pattern: HapticPattern) -> CoreResult<()> {
        Ok(())
    }

    fn vibrate(&self, _pattern_ms: &[u64]) -> CoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_routine_accepts_free() {
        assert_eq!(parse_routine("free").unwrap(), FREE_ROUTINE_ID);
        assert_eq!(parse_routine("3").unwrap(), 3);
        assert!(parse_routine("legs").is_err());
    }

    #[test]
    fn adjust_accepts_steps_and_seconds() {
        assert_eq!(parse_delta("+", 10).unwrap(), 10);
        assert_eq!(parse_delta("-", 10).unwrap(), -10);
        assert_eq!(parse_delta("+30", 10).unwrap(), 30);
        assert_eq!(parse_delta("-5", 10).unwrap(), -5);
        assert!(parse_delta("soon", 10).is_err());
    }

    #[test]
    fn stdin_lines_map_to_actions() {
        assert_eq!(parse_line("next\n"), Some(Action::CompleteSet));
        assert_eq!(parse_line("pause"), Some(Action::ToggleTimer));
        assert_eq!(parse_line("finish"), Some(Action::Finish));
        assert_eq!(parse_line("jump"), None);
    }
}
