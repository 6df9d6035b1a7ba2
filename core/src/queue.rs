// Async FIFO queue with single-consumer wakeup
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

/// Unbounded FIFO queue feeding a single suspended consumer at a time.
///
/// A `push` while a consumer is suspended in [`next_item`](Self::next_item)
/// wakes that consumer and hands it the item; the consumer never observes an
/// empty queue it has to re-poll. [`stop`](Self::stop) discards all pending
/// items and wakes the waiter with `None`; the queue stays usable afterwards.
///
/// Only one suspended consumer is supported. Call sites must serialize calls
/// to `next_item`; concurrent waiters may be served out of order.
pub struct AsyncQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
}

struct Inner<T> {
    items: VecDeque<T>,
    // Bumped by stop() so a suspended consumer can tell a stop wakeup
    // from a push wakeup.
    stop_epoch: u64,
}

impl<T> AsyncQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                stop_epoch: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item, waking the suspended consumer if there is one.
    pub fn push(&self, item: T) {
        self.lock().items.push_back(item);
        self.notify.notify_one();
    }

    /// Take the next item, suspending while the queue is empty.
    ///
    /// Returns `Some(item)` as soon as an item is available and `None` when
    /// the queue is stopped while waiting. Cancel-safe: a cancelled call
    /// leaves every item in the queue.
    pub async fn next_item(&self) -> Option<T> {
        let epoch = {
            let mut inner = self.lock();
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            inner.stop_epoch
        };
        loop {
            // Register for the wakeup before re-checking, so a push landing
            // between the check and the await is not missed.
            let notified = self.notify.notified();
            {
                let mut inner = self.lock();
                if let Some(item) = inner.items.pop_front() {
                    return Some(item);
                }
                if inner.stop_epoch != epoch {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Discard all pending items and wake the suspended consumer with `None`.
    ///
    /// Does not prevent further pushes; the queue is reusable.
    pub fn stop(&self) {
        {
            let mut inner = self.lock();
            inner.items.clear();
            inner.stop_epoch += 1;
        }
        self.notify.notify_one();
    }

    /// Current item count.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for AsyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
