//! Window-change notifications, coalesced for a single consumer.

use std::sync::Arc;

use futures::{StreamExt, stream::BoxStream};
use tokio::{sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Stream of raw window-change notifications.
pub type ResizeSignals = BoxStream<'static, ()>;

/// Surfaces window-change notifications to the session event loop.
///
/// Notifications that arrive before the previous one was consumed collapse
/// into a single pending event.
pub struct ResizeWatcher {
    notify: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl ResizeWatcher {
    /// A watcher that is not subscribed to anything and never fires.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            task: None,
        }
    }

    /// Start draining `signals` until it ends or `cancel` fires.
    #[must_use]
    pub fn spawn(mut signals: ResizeSignals, cancel: CancellationToken) -> Self {
        let notify = Arc::new(Notify::new());
        let pending = Arc::clone(&notify);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    next = signals.next() => match next {
                        Some(()) => pending.notify_one(),
                        None => break,
                    },
                }
            }
            tracing::debug!("Resize watcher stopped");
        });

        Self {
            notify,
            task: Some(task),
        }
    }

    /// Whether a subscription was started.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for the next (possibly coalesced) notification.
    pub async fn changed(&self) {
        self.notify.notified().await;
    }

    /// Release the subscription.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ResizeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::channel::mpsc;
    use tokio::time::{sleep, timeout};

    use super::*;

    #[tokio::test]
    async fn test_disabled_never_fires() {
        let watcher = ResizeWatcher::disabled();
        assert!(!watcher.is_active());
        let mut changed = tokio_test::task::spawn(watcher.changed());
        tokio_test::assert_pending!(changed.poll());
    }

    #[tokio::test]
    async fn test_notifications_coalesce() {
        let (tx, rx) = mpsc::unbounded();
        let watcher = ResizeWatcher::spawn(Box::pin(rx), CancellationToken::new());
        assert!(watcher.is_active());

        for _ in 0..3 {
            tx.unbounded_send(()).unwrap();
        }
        sleep(Duration::from_millis(20)).await;

        assert!(timeout(Duration::from_millis(100), watcher.changed()).await.is_ok());
        assert!(timeout(Duration::from_millis(20), watcher.changed()).await.is_err());
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let (tx, rx) = mpsc::unbounded();
        let cancel = CancellationToken::new();
        let watcher = ResizeWatcher::spawn(Box::pin(rx), cancel.clone());

        cancel.cancel();
        sleep(Duration::from_millis(20)).await;

        let _ = tx.unbounded_send(());
        sleep(Duration::from_millis(20)).await;
        assert!(timeout(Duration::from_millis(20), watcher.changed()).await.is_err());
    }
}
