//! Background garbage collection of idle sessions.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::manager::Manager;

/// Handle to a running GC task.
///
/// The task sweeps once immediately and then every `max_age` until its
/// token is cancelled. Dropping the handle does not stop the task; call
/// [`GcTask::shutdown`] (or cancel the token) to stop it.
pub struct GcTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl GcTask {
    pub(crate) fn spawn<V>(manager: Arc<Manager<V>>, token: CancellationToken) -> Self
    where
        V: Clone + Send + Sync + 'static,
    {
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let period = manager.max_age();
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(period_secs = period.as_secs(), "Session GC task started");
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        manager.gc();
                    }
                }
            }
            debug!("Session GC task stopped");
        });

        Self { token, handle }
    }

    /// Token controlling this task.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Signal the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Session GC task ended abnormally");
        }
    }
}
