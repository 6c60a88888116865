use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::error;

/// Completion counter shared between an orchestrator and its fetch tasks
#[derive(Debug, Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    zero: Notify,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` more operations before dispatching them
    pub fn add(&self, n: usize) {
        self.inner.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Report one operation as finished
    ///
    /// The count saturates at zero. Guards drop during unwinding, so an
    /// extra release is logged rather than raised.
    pub fn done(&self) {
        let released = self
            .inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match released {
            Ok(1) => self.inner.zero.notify_waiters(),
            Ok(_) => {}
            Err(_) => error!("WaitGroup released more times than added"),
        }
    }

    /// Guard that calls [`WaitGroup::done`] when dropped
    ///
    /// Runs on normal return, early return, unwinding and task abort alike.
    pub fn release_on_drop(&self) -> WaitGroupGuard {
        WaitGroupGuard { group: self.clone() }
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Wait until every registered operation has reported
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.zero.notified();
            tokio::pin!(notified);
            // register interest before checking so a release in between is not lost
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
#[must_use = "dropping the guard releases the wait group immediately"]
pub struct WaitGroupGuard {
    group: WaitGroup,
}

impl Drop for WaitGroupGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_immediately_when_empty() {
        let wg = WaitGroup::new();
        tokio::time::timeout(Duration::from_secs(1), wg.wait())
            .await
            .expect("empty group should not block");
    }

    #[tokio::test]
    async fn test_wait_until_all_done() {
        let wg = WaitGroup::new();
        wg.add(3);

        for delay in [5u64, 10, 15] {
            let wg = wg.clone();
            tokio::spawn(async move {
                let _release = wg.release_on_drop();
                tokio::time::sleep(Duration::from_millis(delay)).await;
            });
        }

        tokio::time::timeout(Duration::from_secs(2), wg.wait())
            .await
            .expect("all tasks should release");
        assert_eq!(wg.pending(), 0);
    }

    #[tokio::test]
    async fn test_guard_releases_on_panic() {
        let wg = WaitGroup::new();
        wg.add(1);

        let task_wg = wg.clone();
        let handle = tokio::spawn(async move {
            let _release = task_wg.release_on_drop();
            panic!("fetch blew up");
        });

        assert!(handle.await.is_err());
        assert_eq!(wg.pending(), 0);
    }

    #[test]
    fn test_extra_release_saturates() {
        let wg = WaitGroup::new();
        wg.add(1);
        wg.done();
        wg.done();
        assert_eq!(wg.pending(), 0);

        wg.add(1);
        assert_eq!(wg.pending(), 1);
    }

    #[tokio::test]
    async fn test_guard_releases_on_abort() {
        let wg = WaitGroup::new();
        wg.add(1);

        let task_wg = wg.clone();
        let handle = tokio::spawn(async move {
            let _release = task_wg.release_on_drop();
            std::future::pending::<()>().await;
        });
        handle.abort();
        let _ = handle.await;

        tokio::time::timeout(Duration::from_secs(1), wg.wait())
            .await
            .expect("aborted task should release");
    }
}
