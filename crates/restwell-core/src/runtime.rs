//! Cooperative run loop for a session.
//!
//! One task owns the controller. Timer ticks, mailbox polls, debounce
//! flushes and UI actions are branches of a single `select!`, so each runs
//! to completion before the next one is looked at. Worst-case latency for
//! a mailbox command is one poll interval.

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::controller::{Action, SessionController};
use crate::events::Event;

/// Drive `controller` until the session ends or `actions` closes.
///
/// Every produced event is handed to `on_event` in order. Pending snapshot
/// writes are flushed before returning.
pub async fn run_session<F>(
    controller: &mut SessionController,
    mut actions: mpsc::Receiver<Action>,
    mut on_event: F,
) where
    F: FnMut(&Event),
{
    let config = controller.config().clone();
    let start = Instant::now();
    let mut ticks = time::interval_at(start + config.tick_interval, config.tick_interval);
    let mut polls = time::interval_at(start + config.poll_interval, config.poll_interval);
    let flush_every = config.debounce.max(config.poll_interval);
    let mut flushes = time::interval_at(start + flush_every, flush_every);
    for interval in [&mut ticks, &mut polls, &mut flushes] {
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    emit(controller, &mut on_event);
    info!("session loop started");

    while controller.is_active() {
        tokio::select! {
            _ = ticks.tick() => {
                controller.on_tick();
            }
            _ = polls.tick() => {
                controller.poll_commands();
            }
            _ = flushes.tick() => {
                if controller.flush_if_due() {
                    debug!("snapshot flushed");
                }
            }
            action = actions.recv() => match action {
                Some(action) => {
                    if let Err(e) = controller.apply(action) {
                        warn!(error = %e, "action failed");
                    }
                }
                None => {
                    debug!("action channel closed");
                    emit(controller, &mut on_event);
                    break;
                }
            },
        }
        emit(controller, &mut on_event);
    }

    controller.flush();
    info!(active = controller.is_active(), "session loop stopped");
}

fn emit<F: FnMut(&Event)>(controller: &mut SessionController, on_event: &mut F) {
    for event in controller.take_events() {
        on_event(&event);
    }
}
