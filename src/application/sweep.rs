//! Periodic background housekeeping.
//!
//! A [`Sweeper`] runs a synchronous closure on a fixed interval inside a
//! tokio task until it is stopped. The cache and the progress registry both
//! use it for their expiry sweeps.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running periodic sweep.
///
/// Dropping the handle without calling [`Sweeper::stop`] closes the shutdown
/// channel, which also ends the task.
#[derive(Debug)]
pub struct Sweeper {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a sweep that calls `tick` every `interval`.
    ///
    /// The first call happens one full interval after spawning. `tick`
    /// returns the number of entries it removed, which is logged when
    /// non-zero. Must be called from within a tokio runtime.
    ///
    /// `interval` must be non-zero; the spawned task panics otherwise.
    /// Validated configs never produce a zero interval.
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> usize + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Skip the immediate first tick
            timer.tick().await;

            info!(sweep = name, interval_secs = interval.as_secs(), "Sweep started");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = timer.tick() => {
                        let removed = tick();
                        if removed > 0 {
                            debug!(sweep = name, removed, "Sweep removed entries");
                        }
                    }
                }
            }

            info!(sweep = name, "Sweep stopped");
        });

        Self {
            name,
            shutdown_tx,
            join,
        }
    }

    /// Name given at spawn time.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the sweep to stop and wait for its task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            if e.is_panic() {
                tracing::error!(sweep = self.name, "Sweep task panicked");
            }
        }
    }
}
