//! Handle for a cancellable background loop

use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::store::{StoreError, StoreResult};

/// A spawned maintenance loop (compaction or replication).
///
/// The loop receives a shutdown channel and must exit when it fires.
/// Dropping the handle signals shutdown without waiting.
#[derive(Debug)]
pub struct BackgroundTask {
    name: &'static str,
    shutdown_tx: broadcast::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    /// Spawn `body` on the current tokio runtime.
    ///
    /// Outside a runtime this is a client error.
    pub(crate) fn spawn<F, Fut>(name: &'static str, body: F) -> StoreResult<Self>
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| {
            StoreError::client(format!("{} task requires a tokio runtime", name))
        })?;
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = runtime.spawn(body(shutdown_rx));

        Ok(Self {
            name,
            shutdown_tx,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the loop to stop without waiting for it
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Whether the loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_finished()).unwrap_or(true)
    }

    /// Signal the loop to stop and wait for it to exit
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_requires_runtime() {
        let err = BackgroundTask::spawn("test", |_rx| async {}).unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let exited = Arc::new(AtomicBool::new(false));
        let flag = exited.clone();
        let task = BackgroundTask::spawn("test", move |mut rx| async move {
            let _ = rx.recv().await;
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

        assert_eq!(task.name(), "test");
        task.shutdown().await;
        assert!(exited.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_signals_stop() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let task = BackgroundTask::spawn("test", move |mut rx| async move {
            let _ = rx.recv().await;
            let _ = done_tx.send(());
        })
        .unwrap();
        drop(task);
        tokio::time::timeout(std::time::Duration::from_secs(5), done_rx)
            .await
            .expect("loop should exit")
            .unwrap();
    }
}
