//! Background maintenance ticker shared by the consensus engines.
//!
//! Each engine owns one background task that wakes on a fixed period and
//! runs a maintenance callback. The task observes an explicit cancellation
//! signal at every wake, so `stop` takes effect at the next wake without
//! tearing the task down mid-callback.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

struct RunningTicker {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// An owned, cancellable periodic task.
///
/// `start` spawns the task on the ambient Tokio runtime; `stop` signals it
/// and is idempotent.
pub(crate) struct Ticker {
    inner: Mutex<Option<RunningTicker>>,
}

impl Ticker {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Spawns the periodic task. Returns `false` if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start<F>(&self, period: Duration, mut on_tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.is_some() {
            return false;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            // First wake after one full period, matching a plain ticker.
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    _ = interval.tick() => on_tick(),
                    _ = shutdown_rx.changed() => {
                        trace!("Ticker observed shutdown signal");
                        break;
                    }
                }
            }
        });

        *inner = Some(RunningTicker { shutdown, task });
        true
    }

    /// Signals the task to exit at its next wake. Returns `false` if the
    /// ticker was not running.
    pub(crate) fn stop(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.take() {
            Some(running) => {
                // The task breaks out of its select loop on this signal; the
                // handle is dropped rather than awaited so stop stays
                // non-blocking.
                let _ = running.shutdown.send(true);
                drop(running.task);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}
