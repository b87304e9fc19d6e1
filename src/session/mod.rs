/// Timed practice sessions
///
/// `timer` holds the countdown state machine; `runner` drives it from a
/// tokio interval and owns the tick task's lifetime.

pub mod runner;
pub mod timer;

pub use runner::{SessionRunner, TICK_PERIOD};
pub use timer::{
    CompletionCallback, SessionTimer, TimerError, TimerSnapshot, TimerState, MAX_SESSION_SECS,
};
