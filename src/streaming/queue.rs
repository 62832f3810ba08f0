//! Bounded sample queue between acquisition and the network sender
//!
//! A FIFO of opaque sample buffers with drop-oldest backpressure: when a
//! push would exceed the configured depth, the single oldest buffer is
//! discarded before the new one is admitted. The sender drains the whole
//! queue per wake so no lock is held during socket I/O, and waits on a
//! condition variable with a timeout; a timeout means the acquisition
//! path has stalled and is fatal to the session, not a transient empty.

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct Inner {
    buffers: VecDeque<Vec<u8>>,
    /// Total buffers evicted by overflow since construction
    dropped: u64,
}

/// Thread-safe bounded FIFO of sample buffers
pub struct SampleQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    max_depth: usize,
}

impl SampleQueue {
    pub fn new(max_depth: usize) -> Self {
        assert!(max_depth > 0, "queue depth must be at least 1");
        Self {
            inner: Mutex::new(Inner {
                buffers: VecDeque::with_capacity(max_depth.min(4096)),
                dropped: 0,
            }),
            not_empty: Condvar::new(),
            max_depth,
        }
    }

    /// Append a buffer, evicting the oldest one first if the queue is at
    /// capacity, and wake a waiting consumer.
    pub fn push(&self, buffer: Vec<u8>) {
        let mut inner = self.inner.lock();
        if inner.buffers.len() == self.max_depth {
            inner.buffers.pop_front();
            inner.dropped += 1;
            if inner.dropped == 1 || inner.dropped % 100 == 0 {
                log::warn!(
                    "sample queue full (depth {}), dropped {} buffers so far",
                    self.max_depth,
                    inner.dropped
                );
            }
        }
        inner.buffers.push_back(buffer);
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Detach and return the entire queued sequence, leaving the queue
    /// empty. Buffers come out in push order.
    pub fn drain_all(&self) -> VecDeque<Vec<u8>> {
        std::mem::take(&mut self.inner.lock().buffers)
    }

    /// Block until the queue is non-empty or `timeout` elapses.
    ///
    /// A timeout is reported as [`Error::ProducerStall`]; the producer is
    /// presumed dead and the session should end.
    pub fn wait_non_empty(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.buffers.is_empty() {
            if self.not_empty.wait_until(&mut inner, deadline).timed_out()
                && inner.buffers.is_empty()
            {
                return Err(Error::ProducerStall(timeout));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffers evicted by overflow since construction
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = SampleQueue::new(10);
        queue.push(vec![1]);
        queue.push(vec![2]);
        queue.push(vec![3]);

        let drained: Vec<_> = queue.drain_all().into_iter().collect();
        assert_eq!(drained, vec![vec![1], vec![2], vec![3]]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let queue = SampleQueue::new(2);
        queue.push(vec![b'A']);
        queue.push(vec![b'B']);
        queue.push(vec![b'C']);

        assert_eq!(queue.dropped(), 1);
        let drained: Vec<_> = queue.drain_all().into_iter().collect();
        assert_eq!(drained, vec![vec![b'B'], vec![b'C']]);
    }

    #[test]
    fn test_depth_never_exceeded() {
        let queue = SampleQueue::new(5);
        for n in 0..50u8 {
            queue.push(vec![n]);
            assert!(queue.len() <= 5);
        }
        // The five most recently pushed buffers survive
        let drained: Vec<_> = queue.drain_all().into_iter().collect();
        assert_eq!(drained, (45..50u8).map(|n| vec![n]).collect::<Vec<_>>());
        assert_eq!(queue.dropped(), 45);
    }

    #[test]
    fn test_wait_times_out_when_empty() {
        let queue = SampleQueue::new(4);
        let result = queue.wait_non_empty(Duration::from_millis(20));
        assert!(matches!(result, Err(Error::ProducerStall(_))));
    }

    #[test]
    fn test_wait_returns_immediately_when_non_empty() {
        let queue = SampleQueue::new(4);
        queue.push(vec![1]);
        assert!(queue.wait_non_empty(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_push_wakes_waiter() {
        let queue = Arc::new(SampleQueue::new(4));
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            producer.push(vec![42]);
        });

        assert!(queue.wait_non_empty(Duration::from_secs(5)).is_ok());
        assert_eq!(queue.len(), 1);
        handle.join().unwrap();
    }
}
