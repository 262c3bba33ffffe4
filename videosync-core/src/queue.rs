//! Relay queue
//!
//! Ordered hand-off buffer between the thread producing transport events
//! and the channel I/O thread. One producer, one consumer per role.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Mutex-protected FIFO with blocking consumption.
///
/// Unbounded: traffic is a few events per second and every state-changing
/// emit clears the queue first, so depth stays small in practice. Cloning
/// returns a handle to the same queue.
pub struct RelayQueue<T> {
    inner: Arc<QueueInner<T>>,
}

struct QueueInner<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> Clone for RelayQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for RelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RelayQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(QueueInner {
                items: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
            }),
        }
    }

    /// Append an event in FIFO order
    pub fn push(&self, item: T) {
        self.inner.items.lock().push_back(item);
        self.inner.available.notify_one();
    }

    /// Atomically discard everything currently queued
    pub fn clear(&self) {
        self.inner.items.lock().clear();
    }

    /// Remove and return the oldest event without waiting
    pub fn try_pop(&self) -> Option<T> {
        self.inner.items.lock().pop_front()
    }

    /// Remove and return the oldest event, suspending until one arrives
    pub fn pop_blocking(&self) -> T {
        let mut items = self.inner.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return item;
            }
            self.inner.available.wait(&mut items);
        }
    }

    /// Like [`RelayQueue::pop_blocking`] but gives up after `timeout`, so
    /// loop threads can re-check their shutdown flag
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.inner.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self
                .inner
                .available
                .wait_until(&mut items, deadline)
                .timed_out()
            {
                return items.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = RelayQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_clear_discards_everything() {
        let queue = RelayQueue::new();
        queue.push("a");
        queue.push("b");
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_pop_blocking_across_threads() {
        let queue = RelayQueue::new();
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(7);
        });
        assert_eq!(queue.pop_blocking(), 7);
        handle.join().unwrap();
    }

    #[test]
    fn test_pop_timeout_expires_on_empty_queue() {
        let queue: RelayQueue<u8> = RelayQueue::new();
        let start = Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_pop_timeout_returns_early_when_item_arrives() {
        let queue = RelayQueue::new();
        let producer = queue.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(9);
        });
        assert_eq!(queue.pop_timeout(Duration::from_secs(5)), Some(9));
        handle.join().unwrap();
    }
}
