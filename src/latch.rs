// First-paint latch: the first render waits until every admitted entity has
// produced one result (a snapshot or an error).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
pub struct FirstPaintLatch {
    pending: AtomicUsize,
    notify: Notify,
}

impl FirstPaintLatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more entity; the returned signal releases it exactly once.
    pub fn register(self: &Arc<Self>) -> FirstResult {
        self.pending.fetch_add(1, Ordering::AcqRel);
        FirstResult {
            latch: Some(self.clone()),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until every registered signal has been released.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Like `wait`, giving up after `limit`. Returns whether everything was released.
    pub async fn wait_for(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.wait()).await.is_ok()
    }

    fn release_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.notify.notify_waiters();
        }
    }
}

/// Single-use "first result available" signal owned by a collector. Dropping it
/// (normal exit, abort, panic unwind) releases it if it has not fired yet.
pub struct FirstResult {
    latch: Option<Arc<FirstPaintLatch>>,
}

impl FirstResult {
    /// Fire the signal. Returns `true` only for the call that actually released it.
    pub fn release(&mut self) -> bool {
        match self.latch.take() {
            Some(latch) => {
                latch.release_one();
                true
            }
            None => false,
        }
    }
}

impl Drop for FirstResult {
    fn drop(&mut self) {
        self.release();
    }
}
