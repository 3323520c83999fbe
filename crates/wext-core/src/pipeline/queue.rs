//! Coalescing change queue for dev mode.
//!
//! The watcher pushes changed paths at any time. The dev loop takes
//! everything queued so far as one batch, so triggers that arrive while a pass
//! is running collapse into a single follow-up pass.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: Mutex<BTreeSet<PathBuf>>,
    notify: Notify,
    closed: AtomicBool,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue changed paths. Ignored after [`close`](Self::close).
    pub fn push<I>(&self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let added = {
            let mut pending = self.pending.lock();
            let before = pending.len();
            pending.extend(paths);
            pending.len() > before
        };
        if added {
            self.notify.notify_one();
        }
    }

    /// Take everything queued, without waiting.
    pub fn take(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.pending.lock())
            .into_iter()
            .collect()
    }

    /// Wait for the next non-empty batch. `None` once closed and drained.
    pub async fn next_batch(&self) -> Option<Vec<PathBuf>> {
        loop {
            let notified = self.notify.notified();
            let batch = self.take();
            if !batch.is_empty() {
                return Some(batch);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Stop accepting changes and wake the waiting loop.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
