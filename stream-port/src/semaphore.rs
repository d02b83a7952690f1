use crate::errors::{Error, Result};

/// A POSIX-style counting semaphore, built the way `channellib` wraps
/// `crossbeam-channel`: a post is a non-blocking send of a unit token, a
/// wait is a receive. Capacity is effectively unbounded (we never want
/// `post` inside `end_write` to block the writer), so outstanding posts
/// simply queue up until a reader drains them.
pub struct Semaphore {
    tx: channellib::Sender<()>,
    rx: channellib::Receiver<()>,
}

impl Semaphore {
    pub fn new() -> Self {
        let (tx, rx) = channellib::unbounded();
        Self { tx, rx }
    }

    /// Increment the semaphore. Never blocks.
    pub fn post(&self) {
        // An unbounded channel's send only fails if every receiver has been
        // dropped, which cannot happen while `self` is alive (we hold `rx`).
        self.tx.send(()).ok();
    }

    /// Block until the semaphore is non-zero, then decrement it by one.
    pub fn wait(&self, stream_name: &str) -> Result<()> {
        self.rx
            .recv()
            .map_err(|_| Error::Disconnected(stream_name.to_string()))
    }

    /// Non-blocking: decrement by one and return `true` if the semaphore
    /// was non-zero, `false` (without blocking) otherwise.
    pub fn trywait(&self) -> bool {
        self.rx.try_recv().is_ok()
    }

    /// Drain the semaphore to zero, discarding any queued posts. Used by
    /// readers so they never act on readiness signals accumulated during
    /// their own previous processing (spec.md §5).
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new()
    }
}
