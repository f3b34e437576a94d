//! Reference queue: where reclaimed records wait for the reaper

use std::fmt;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};

/// Why a timed removal returned without an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveError {
    /// Nothing arrived before the deadline
    Timeout,
    /// Every producer is gone and the queue is drained
    Disconnected,
}

/// Unbounded, thread-safe, blocking FIFO of reclaimed references.
///
/// Any number of threads may enqueue; the reaper is the intended single consumer.
///
/// # Examples
///
/// ```
/// use lifeline::reclaim::ReferenceQueue;
///
/// let queue = ReferenceQueue::new();
/// queue.enqueue("first");
/// queue.enqueue("second");
///
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.poll(), Some("first"));
/// assert_eq!(queue.remove(), Some("second"));
/// assert!(queue.is_empty());
/// ```
pub struct ReferenceQueue<R> {
    sender: Sender<R>,
    receiver: Receiver<R>,
}

impl<R> ReferenceQueue<R> {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// Append a reclaimed reference. Never blocks.
    pub fn enqueue(&self, reference: R) -> bool {
        self.sender.send(reference).is_ok()
    }

    /// Block until a reference is available.
    pub fn remove(&self) -> Option<R> {
        self.receiver.recv().ok()
    }

    /// Block for at most `timeout` waiting for a reference.
    pub fn remove_timeout(&self, timeout: Duration) -> Result<R, RemoveError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => RemoveError::Timeout,
            RecvTimeoutError::Disconnected => RemoveError::Disconnected,
        })
    }

    /// Take a reference if one is already queued.
    pub fn poll(&self) -> Option<R> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<R> Default for ReferenceQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ReferenceQueue<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<R> fmt::Debug for ReferenceQueue<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn fifo_order_is_preserved() {
        let queue = ReferenceQueue::new();
        for i in 0..5 {
            assert!(queue.enqueue(i));
        }
        let drained: Vec<_> = std::iter::from_fn(|| queue.poll()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn remove_timeout_reports_timeout_on_empty_queue() {
        let queue: ReferenceQueue<u8> = ReferenceQueue::new();
        let started = Instant::now();
        assert_eq!(
            queue.remove_timeout(Duration::from_millis(20)),
            Err(RemoveError::Timeout)
        );
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn blocking_remove_wakes_on_enqueue_from_other_thread() {
        let queue = Arc::new(ReferenceQueue::new());
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            producer.enqueue(99u32);
        });

        assert_eq!(queue.remove(), Some(99));
        handle.join().unwrap();
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(ReferenceQueue::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        q.enqueue(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 800);
        let mut drained: Vec<_> = std::iter::from_fn(|| queue.poll()).collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..800).collect::<Vec<_>>());
    }
}
