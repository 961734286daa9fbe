//! Cancellable handle for background polling tasks.

use tokio::task::{JoinError, JoinHandle};

/// Handle to a spawned polling loop.
///
/// Dropping the handle aborts the task, so abandoning a flow (the UI
/// equivalent of navigating away) clears its timers. An already-submitted
/// on-chain transaction is of course unaffected.
#[derive(Debug)]
pub struct PollTask<T> {
    handle: Option<JoinHandle<T>>,
}

impl<T> PollTask<T> {
    pub(crate) fn wrap(handle: JoinHandle<T>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Stops the task without waiting for it.
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the task's result. Returns the join error if the task was
    /// cancelled or panicked.
    pub async fn join(mut self) -> Result<T, JoinError> {
        match self.handle.take() {
            Some(handle) => handle.await,
            // `handle` is only vacated by cancel/join, both of which consume
            // self; pending here is unreachable in practice.
            None => std::future::pending().await,
        }
    }
}

impl<T> Drop for PollTask<T> {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn join_returns_task_output() {
        let task = PollTask::wrap(tokio::spawn(async { 7 }));
        assert_eq!(task.join().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn cancel_aborts_the_task() {
        let task = PollTask::wrap(tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }));
        task.cancel();
        // Nothing to assert beyond not hanging; the sleep never completes.
    }

    #[tokio::test]
    async fn drop_aborts_the_task() {
        let (sender, receiver) = tokio::sync::oneshot::channel::<()>();
        let task = PollTask::wrap(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            drop(sender);
        }));

        drop(task);

        // The abort drops the sender without sending.
        assert!(receiver.await.is_err());
    }
}
