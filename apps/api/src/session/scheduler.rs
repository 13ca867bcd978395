use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs a task once its quiet period has passed without another `schedule` call.
///
/// Each scheduled run owns a `CancellationToken`. Scheduling again cancels the
/// previous token, whether that run is still sleeping or already executing,
/// and the task receives its token so it can stop cooperatively.
#[derive(Default)]
pub struct DebounceScheduler {
    pending: Mutex<Option<CancellationToken>>,
}

impl DebounceScheduler {
    pub async fn schedule<F, Fut>(&self, delay: Duration, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().await.replace(token.clone()) {
            if !previous.is_cancelled() {
                debug!("Rescheduling pending run");
            }
            previous.cancel();
        }

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    task(token.clone()).await;
                    // Finished runs leave nothing for `cancel` to report.
                    token.cancel();
                }
            }
        });
    }

    /// Cancels the pending or running task. Returns false if there was none.
    pub async fn cancel(&self) -> bool {
        match self.pending.lock().await.take() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }
}
