// Cancellable delayed work
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Handle to work that runs after a delay unless cancelled first.
/// Dropping the handle cancels the work.
#[derive(Debug)]
pub struct CancellableTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CancellableTask {
    pub fn spawn_after<F>(delay: Duration, work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel_rx => {
                    tracing::debug!("Delayed task cancelled before it ran");
                }
                _ = tokio::time::sleep(delay) => {
                    work.await;
                }
            }
        });

        Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    /// Stop the work whether it is still waiting or already running
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the task to stop, whether it ran or was cancelled
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for CancellableTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
