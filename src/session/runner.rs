/// Tick source for a session timer
///
/// A `SessionRunner` owns a spawned tokio task that ticks a `SessionTimer`
/// once per period. The task is stopped when the timer finishes, when
/// `cancel` is called, or when the runner is dropped.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::session::{SessionTimer, TimerError, TimerSnapshot, TimerState};

/// Default tick period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct SessionRunner {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<TimerState>>,
    snapshots: watch::Receiver<TimerSnapshot>,
}

impl SessionRunner {
    /// Start `timer` and tick it every `period` on the current tokio runtime
    pub fn spawn(mut timer: SessionTimer, period: Duration) -> Result<Self, TimerError> {
        let handle = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let period = period.max(Duration::from_millis(1));

        timer.start()?;
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let (snapshot_tx, snapshot_rx) = watch::channel(timer.snapshot());

        let task = handle.spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    // Cancel wins over a tick that is due in the same poll
                    biased;

                    // Fires on an explicit cancel and when the runner is dropped
                    _ = &mut cancel_rx => {
                        timer.cancel();
                        let _ = snapshot_tx.send(timer.snapshot());
                        break;
                    }
                    _ = ticks.tick() => {
                        let state = timer.tick();
                        let _ = snapshot_tx.send(timer.snapshot());
                        if state.is_terminal() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Session timer stopped in state {:?}", timer.state());
            timer.state()
        });

        Ok(Self {
            cancel: Some(cancel_tx),
            task: Some(task),
            snapshots: snapshot_rx,
        })
    }

    /// Latest published state of the timer
    pub fn snapshot(&self) -> TimerSnapshot {
        *self.snapshots.borrow()
    }

    /// Ask the tick task to stop; no completion callback will run afterwards
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the tick task to end and return the final state
    pub async fn wait(mut self) -> TimerState {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(TimerState::Cancelled),
            None => self.snapshot().state,
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
