//! Per-job progress state with fan-out to live subscribers.
//!
//! ```text
//!   update_progress / complete / fail
//!        │  (state mutex held for the whole broadcast)
//!        ├──► try_send ──► [queue S1] ──► observer 1
//!        ├──► try_send ──► [queue S2] ──► observer 2   (full → update dropped)
//!        └──► try_send ──► [queue SN] ──► observer N
//! ```
//!
//! Each subscriber queue is bounded. A full queue loses that update for that
//! subscriber only; the producer never waits. On `complete`/`fail` the final
//! update is sent and the tracker drops its senders, which closes every queue
//! while leaving whatever is already buffered readable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{ProgressState, ProgressStatus, ProgressUpdate, TaskId};

struct TrackerInner {
    state: ProgressState,
    /// Monotonic time of the last state change, for sweep arithmetic.
    last_activity: Instant,
    subscribers: HashMap<u64, mpsc::Sender<ProgressUpdate>>,
}

impl TrackerInner {
    fn touch(&mut self) {
        self.state.updated_at = Utc::now();
        self.last_activity = Instant::now();
    }
}

/// Mutable progress for one job plus its subscribers.
pub struct ProgressTracker {
    task_id: TaskId,
    queue_capacity: usize,
    inner: Mutex<TrackerInner>,
    /// Set exactly once, by whichever terminal transition wins.
    done: AtomicBool,
    done_tx: watch::Sender<bool>,
    next_subscriber: AtomicU64,
    dropped: AtomicU64,
}

impl ProgressTracker {
    /// Create a running tracker at 0%.
    ///
    /// A `queue_capacity` of 0 is treated as 1 so the initial snapshot
    /// always fits.
    pub fn new(task_id: TaskId, queue_capacity: usize) -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            inner: Mutex::new(TrackerInner {
                state: ProgressState::started(task_id.clone()),
                last_activity: Instant::now(),
                subscribers: HashMap::new(),
            }),
            task_id,
            queue_capacity: queue_capacity.max(1),
            done: AtomicBool::new(false),
            done_tx,
            next_subscriber: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Report progress while running.
    ///
    /// The stored percentage never decreases: a lower `percent` than the
    /// current one leaves it unchanged, though a non-empty `message` still
    /// replaces the current message. Values above 100 are clamped. Returns
    /// false and does nothing once the tracker has finished.
    pub fn update_progress(&self, percent: u8, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut inner = self.inner.lock();

        if inner.state.status.is_terminal() {
            debug!(task = %self.task_id, percent, "Ignoring progress update after finish");
            return false;
        }

        inner.state.progress = inner.state.progress.max(percent.min(100));
        if !message.is_empty() {
            inner.state.message = message;
        }
        inner.touch();

        let update = inner.state.to_update();
        self.broadcast(&mut inner, &update);
        true
    }

    /// Mark the job completed at 100%.
    ///
    /// Only the first terminal call has any effect; later calls to
    /// `complete` or `fail` return false.
    pub fn complete(&self, message: impl Into<String>) -> bool {
        self.finish(ProgressStatus::Completed, message.into())
    }

    /// Mark the job failed, keeping its last percentage.
    ///
    /// The stored message becomes `"Error: {error}"`. Only the first
    /// terminal call has any effect.
    pub fn fail(&self, error: impl std::fmt::Display) -> bool {
        self.finish(ProgressStatus::Failed, format!("Error: {error}"))
    }

    /// Fail a job that has been silent for `idle`.
    pub(super) fn abandon(&self, idle: Duration) -> bool {
        let failed = self.finish(
            ProgressStatus::Failed,
            format!("Task timed out: no progress update for {}s", idle.as_secs()),
        );
        if failed {
            info!(task = %self.task_id, idle_secs = idle.as_secs(), "Abandoned task marked failed");
        }
        failed
    }

    fn finish(&self, status: ProgressStatus, message: String) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state.status.is_terminal() {
                debug!(
                    task = %self.task_id,
                    current = %inner.state.status,
                    requested = %status,
                    "Task already finished"
                );
                return false;
            }

            inner.state.status = status;
            if status == ProgressStatus::Completed {
                inner.state.progress = 100;
            }
            if !message.is_empty() {
                inner.state.message = message;
            }
            inner.touch();

            let update = inner.state.to_update();
            self.broadcast(&mut inner, &update);

            // Dropping the senders closes each queue without draining it
            inner.subscribers.clear();
        }

        self.signal_done();
        true
    }

    fn signal_done(&self) {
        if self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.done_tx.send_replace(true);
        }
    }

    fn broadcast(&self, inner: &mut TrackerInner, update: &ProgressUpdate) {
        inner.subscribers.retain(|id, tx| match tx.try_send(update.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    task = %self.task_id,
                    subscriber = id,
                    progress = update.progress,
                    "Subscriber queue full, dropping update"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(task = %self.task_id, subscriber = id, "Subscriber gone, removing");
                false
            }
        });
    }

    /// Open a new subscription.
    ///
    /// The queue starts with a snapshot of the current state. Subscribing to
    /// a finished tracker yields that final snapshot on an already closed
    /// queue.
    pub fn subscribe(&self) -> ProgressSubscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let mut inner = self.inner.lock();
        // Capacity is at least 1, so the snapshot always fits
        let _ = tx.try_send(inner.state.to_update());
        if !inner.state.status.is_terminal() {
            inner.subscribers.insert(id, tx);
        }

        ProgressSubscription { id, rx }
    }

    /// Detach a subscription and close its queue.
    ///
    /// Updates already buffered in the queue stay readable through
    /// `subscription`. Returns false if it was already detached.
    pub fn unsubscribe(&self, subscription: &mut ProgressSubscription) -> bool {
        let removed = self
            .inner
            .lock()
            .subscribers
            .remove(&subscription.id)
            .is_some();
        subscription.rx.close();
        removed
    }

    /// Wait until the job completes or fails.
    pub async fn wait(&self) {
        let mut rx = self.done_tx.subscribe();
        // The sender lives in self, so this only returns once done is set
        let _ = rx.wait_for(|done| *done).await;
    }

    /// Wait for the job to finish, up to `timeout`. Returns whether it finished.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }

    /// Returns true once the job has completed or failed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.inner.lock().state.clone()
    }

    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        self.inner.lock().state.status
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.inner.lock().state.progress
    }

    /// Monotonic time of the last state change.
    #[must_use]
    pub fn last_activity(&self) -> Instant {
        self.inner.lock().last_activity
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Total updates dropped because a subscriber queue was full.
    #[must_use]
    pub fn dropped_updates(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("task_id", &self.task_id)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Receiving end of a tracker subscription.
#[derive(Debug)]
pub struct ProgressSubscription {
    id: u64,
    rx: mpsc::Receiver<ProgressUpdate>,
}

impl ProgressSubscription {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next update. Returns `None` once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<ProgressUpdate> {
        self.rx.recv().await
    }

    /// Take the next buffered update without waiting.
    pub fn try_recv(&mut self) -> Option<ProgressUpdate> {
        self.rx.try_recv().ok()
    }
}
