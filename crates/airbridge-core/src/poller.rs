// ── Periodic polling ──
//
// One background task ticks on a fixed period and runs a sync cycle per
// tick. A failed cycle is logged and the next tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::reconcile::AccessoryReconciler;

/// Shortest period the timer accepts. A zero period is raised to this.
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running poll task. Dropping it leaves the task running;
/// call [`stop`](Self::stop) to end it.
pub struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the timer and wait for the task to exit. A cycle already in
    /// flight runs to completion first.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "poll task did not shut down cleanly");
        }
    }
}

impl AccessoryReconciler {
    /// Start syncing every `period`, beginning immediately. Periods below
    /// [`MIN_POLL_PERIOD`] are raised to it.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollHandle {
        let period = period.max(MIN_POLL_PERIOD);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_task(Arc::clone(self), period, cancel.clone()));
        info!(period_ms = period.as_millis(), "polling started");
        PollHandle { cancel, task }
    }
}

async fn poll_task(reconciler: Arc<AccessoryReconciler>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match reconciler.sync().await {
                    Ok(result) => debug!(
                        added = result.added.len(),
                        updated = result.updated.len(),
                        removed = result.removed.len(),
                        "sync complete"
                    ),
                    Err(CoreError::SyncInProgress) => {
                        debug!("previous sync still running, skipping tick");
                    }
                    Err(e) if e.is_transient() => {
                        info!(error = %e, "cloud unavailable, retrying next tick");
                    }
                    Err(e) => warn!(error = %e, "sync aborted, accessories unchanged"),
                }
            }
        }
    }

    info!("polling stopped");
}
