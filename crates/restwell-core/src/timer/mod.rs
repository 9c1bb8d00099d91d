mod engine;

pub use engine::{Tick, TimerClock, TimerEngine, TimerMode};
