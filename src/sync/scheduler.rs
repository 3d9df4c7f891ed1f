use futures::future::BoxFuture;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    Stopped,
    Scheduled,
    Firing,
}

type Callback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs a callback on a fixed interval using one-shot timers.
///
/// The next timer is armed only after the previous callback has settled, so a
/// callback that outlives the interval delays the next cycle instead of
/// overlapping it.
pub struct PollScheduler {
    name: &'static str,
    phase: Arc<Mutex<SchedulerPhase>>,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl PollScheduler {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            phase: Arc::new(Mutex::new(SchedulerPhase::Stopped)),
            stop_tx: None,
            handle: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase() != SchedulerPhase::Stopped
    }

    /// Arm the first timer. A scheduler that is already running is stopped and
    /// re-armed from scratch; if its callback is still running, the new cycle
    /// starts only after that callback has settled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&mut self, interval: Duration, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let previous = self.halt();

        let callback: Callback = Arc::new(move || Box::pin(callback()));
        let (stop_tx, stop_rx) = watch::channel(false);
        let name = self.name;

        // Each run owns its phase cell, so a detached earlier run cannot
        // overwrite it
        let phase = Arc::new(Mutex::new(SchedulerPhase::Scheduled));
        self.phase = Arc::clone(&phase);

        tracing::info!(
            scheduler = name,
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "Poll scheduler started"
        );

        self.handle = Some(tokio::spawn(run_cycles(
            name, interval, callback, phase, stop_rx, previous,
        )));
        self.stop_tx = Some(stop_tx);
    }

    /// Cancel the pending timer. Idempotent.
    ///
    /// A callback that is already running is left to finish; no further cycle
    /// is armed after it.
    pub fn stop(&mut self) {
        // Detach: the task exits on its own at the next stop check
        drop(self.halt());
    }

    /// Signal the running task to stop and hand back its handle.
    fn halt(&mut self) -> Option<JoinHandle<()>> {
        let stop_tx = self.stop_tx.take()?;
        let _ = stop_tx.send(true);
        set_phase(&self.phase, SchedulerPhase::Stopped);
        tracing::debug!(scheduler = self.name, "Poll scheduler stopped");
        self.handle.take()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_cycles(
    name: &'static str,
    interval: Duration,
    callback: Callback,
    phase: Arc<Mutex<SchedulerPhase>>,
    mut stop_rx: watch::Receiver<bool>,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        tokio::select! {
            _ = previous => {}
            _ = stop_rx.changed() => return,
        }
    }

    loop {
        if !transition(&phase, &stop_rx, SchedulerPhase::Scheduled) {
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            _ = stop_rx.changed() => break,
        }

        if !transition(&phase, &stop_rx, SchedulerPhase::Firing) {
            break;
        }

        tracing::debug!(scheduler = name, "poll_cycle_firing");
        callback().await;
    }

    tracing::debug!(scheduler = name, "poll_task_exited");
}

/// Move to `next` unless a stop was requested. The stop flag is checked under
/// the phase lock so `stop()` always leaves the scheduler in `Stopped`.
fn transition(
    phase: &Mutex<SchedulerPhase>,
    stop_rx: &watch::Receiver<bool>,
    next: SchedulerPhase,
) -> bool {
    let mut current = phase.lock().unwrap_or_else(PoisonError::into_inner);
    if *stop_rx.borrow() {
        *current = SchedulerPhase::Stopped;
        return false;
    }
    *current = next;
    true
}

fn set_phase(phase: &Mutex<SchedulerPhase>, next: SchedulerPhase) {
    *phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
}
