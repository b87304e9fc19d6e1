/// Countdown state machine for timed practice sessions
///
/// `Idle -> Running -> {Completed, Cancelled}`. The timer does not know about
/// wall-clock time; something else calls `tick` once per second.

use serde::Serialize;
use thiserror::Error;

/// Longest session accepted, in seconds
pub const MAX_SESSION_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl TimerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TimerState::Completed | TimerState::Cancelled)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Invalid duration: {0} seconds (expected 0..={max})", max = MAX_SESSION_SECS)]
    InvalidDuration(i64),

    #[error("Cannot {action} a timer that is {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: TimerState,
    },

    #[error("No async runtime available to drive the session timer")]
    NoRuntime,
}

/// Called once when the countdown reaches zero
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Point-in-time view of a timer, for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub duration: u32,
    pub time_remaining: u32,
    pub elapsed_percent: f64,
}

pub struct SessionTimer {
    duration: u32,
    remaining: u32,
    state: TimerState,
    on_complete: Option<CompletionCallback>,
}

impl SessionTimer {
    /// Create an idle timer; negative or oversized durations are rejected
    pub fn new(duration_secs: i64) -> Result<Self, TimerError> {
        if !(0..=MAX_SESSION_SECS).contains(&duration_secs) {
            return Err(TimerError::InvalidDuration(duration_secs));
        }

        Ok(Self {
            duration: duration_secs as u32,
            remaining: duration_secs as u32,
            state: TimerState::Idle,
            on_complete: None,
        })
    }

    /// Attach the completion callback
    pub fn with_completion(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn time_remaining(&self) -> u32 {
        self.remaining
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Idle {
            return Err(TimerError::InvalidTransition {
                action: "start",
                state: self.state,
            });
        }
        self.state = TimerState::Running;
        Ok(())
    }

    /// Advance by one second
    ///
    /// Only a running timer moves. Reaching zero completes the timer and runs
    /// the callback; later ticks are no-ops, so the callback runs at most once.
    pub fn tick(&mut self) -> TimerState {
        if self.state != TimerState::Running {
            return self.state;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Completed;
            if let Some(callback) = self.on_complete.take() {
                callback();
            }
        }
        self.state
    }

    /// Stop without completing; returns whether the timer was stoppable
    pub fn cancel(&mut self) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Running => {
                self.state = TimerState::Cancelled;
                self.on_complete = None;
                true
            }
            TimerState::Completed | TimerState::Cancelled => false,
        }
    }

    /// Share of the duration already elapsed, 0 for a zero-length timer
    pub fn elapsed_percent(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        f64::from(self.duration - self.remaining) / f64::from(self.duration) * 100.0
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            duration: self.duration,
            time_remaining: self.remaining,
            elapsed_percent: self.elapsed_percent(),
        }
    }
}

impl std::fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTimer")
            .field("duration", &self.duration)
            .field("remaining", &self.remaining)
            .field("state", &self.state)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}
