//! Owned background loops with cancellation.
//!
//! Every periodic loop (health probes, acquisition, sensor polling) is spawned
//! through [`TimerHandle::spawn`]. The handle owns the task and its
//! [`CancellationToken`]; dropping the handle cancels the loop, so tearing
//! down whatever owns the handle stops the timer on every exit path.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a spawned periodic task.
#[derive(Debug)]
pub struct TimerHandle {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl TimerHandle {
    /// Spawn `task` with a fresh cancellation token.
    ///
    /// The closure receives a child token and should return once it is
    /// cancelled.
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(task(cancel_token.clone()));
        debug!(timer = name, "Timer started");
        Self {
            name,
            handle: Some(handle),
            cancel_token,
        }
    }

    /// Name given at spawn time.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cancel the loop. It stops at its next await point.
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            debug!(timer = self.name, "Timer cancelled");
            self.cancel_token.cancel();
        }
    }

    /// Whether the background task is still running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Whether [`cancel`](Self::cancel) was called or the handle dropped.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;

    async fn tick_until_cancelled(token: CancellationToken, counter: Arc<AtomicU32>) {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_task() {
        let counter = Arc::new(AtomicU32::new(0));
        let timer = {
            let counter = counter.clone();
            TimerHandle::spawn("test", move |token| tick_until_cancelled(token, counter))
        };

        tokio::time::sleep(Duration::from_millis(350)).await;
        let ticks = counter.load(Ordering::Relaxed);
        assert!(ticks >= 3);

        drop(timer);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::Relaxed), ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_task() {
        let counter = Arc::new(AtomicU32::new(0));
        let timer = {
            let counter = counter.clone();
            TimerHandle::spawn("test", move |token| tick_until_cancelled(token, counter))
        };
        assert!(timer.is_active());
        assert!(!timer.is_cancelled());
        assert_eq!(timer.name(), "test");

        timer.shutdown().await;
        let ticks = counter.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::Relaxed), ticks);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let timer = TimerHandle::spawn("idle", |token| async move {
            token.cancelled().await;
        });
        timer.cancel();
        timer.cancel();
        assert!(timer.is_cancelled());
    }
}
