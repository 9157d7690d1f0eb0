//! Circular sample queue
//!
//! The engine appends a burst of samples once per engine tick; the audio
//! callback pulls whatever it needs on its own thread. `CircularQueue` is
//! the single-threaded ring; `AudioQueue` puts one lock around it and is
//! what the two threads share.
//!
//! Writes and reads that cross the end of the backing array are split into
//! two slice copies.

use parking_lot::{Mutex, MutexGuard};
use sm64_common::AudioConfig;
use std::sync::Arc;
use tracing::debug;

/// What happens when an enqueue does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Reallocate to `max(2 * capacity, len + count)`
    Grow,
    /// Overflow is a caller bug and panics
    Fixed,
}

#[derive(Debug, Clone)]
pub struct CircularQueue<T> {
    buffer: Vec<T>,
    /// Index of the oldest unread element
    head: usize,
    len: usize,
    overflow: Overflow,
}

impl<T: Copy + Default> CircularQueue<T> {
    /// Growable queue
    pub fn new(capacity: usize) -> Self {
        Self::with_overflow(capacity, Overflow::Grow)
    }

    /// Queue that never reallocates
    pub fn fixed(capacity: usize) -> Self {
        Self::with_overflow(capacity, Overflow::Fixed)
    }

    pub fn with_overflow(capacity: usize, overflow: Overflow) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            buffer: vec![T::default(); capacity],
            head: 0,
            len: 0,
            overflow,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free slots before the next enqueue has to grow
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    /// Append `samples` after the newest element
    ///
    /// # Panics
    ///
    /// In `Overflow::Fixed` mode, if `samples` does not fit in the free space.
    pub fn enqueue(&mut self, samples: &[T]) {
        let count = samples.len();
        if count == 0 {
            return;
        }

        if count > self.free() {
            match self.overflow {
                Overflow::Grow => self.grow(self.len + count),
                Overflow::Fixed => panic!(
                    "enqueue of {} samples overflows fixed queue ({} of {} used)",
                    count,
                    self.len,
                    self.capacity()
                ),
            }
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = count.min(capacity - tail);
        self.buffer[tail..tail + first].copy_from_slice(&samples[..first]);
        self.buffer[..count - first].copy_from_slice(&samples[first..]);
        self.len += count;
    }

    /// Move up to `dest.len()` of the oldest elements into `dest`
    ///
    /// Returns how many were copied. Never blocks and never writes past the
    /// copied prefix of `dest`.
    pub fn dequeue(&mut self, dest: &mut [T]) -> usize {
        let count = self.peek(dest);
        self.head = (self.head + count) % self.capacity();
        self.len -= count;
        count
    }

    /// Copy up to `dest.len()` of the oldest elements without consuming them
    pub fn peek(&self, dest: &mut [T]) -> usize {
        let count = dest.len().min(self.len);
        let capacity = self.capacity();
        let first = count.min(capacity - self.head);
        dest[..first].copy_from_slice(&self.buffer[self.head..self.head + first]);
        dest[first..count].copy_from_slice(&self.buffer[..count - first]);
        count
    }

    /// Drop all unread elements, keeping the allocation
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    fn grow(&mut self, needed: usize) {
        let capacity = (self.capacity() * 2).max(needed);
        let mut buffer = vec![T::default(); capacity];
        self.peek(&mut buffer[..self.len]);
        self.buffer = buffer;
        self.head = 0;
        debug!("Audio queue grew to {} samples ({} unread)", capacity, self.len);
    }
}

/// Sample queue shared by the engine thread and the audio callback
#[derive(Debug, Clone)]
pub struct AudioQueue {
    inner: Arc<Mutex<CircularQueue<i16>>>,
}

impl AudioQueue {
    pub fn new(capacity: usize) -> Self {
        Self::from_queue(CircularQueue::new(capacity))
    }

    pub fn fixed(capacity: usize) -> Self {
        Self::from_queue(CircularQueue::fixed(capacity))
    }

    pub fn from_queue(queue: CircularQueue<i16>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }

    pub fn enqueue(&self, samples: &[i16]) {
        self.inner.lock().enqueue(samples);
    }

    pub fn dequeue(&self, dest: &mut [i16]) -> usize {
        self.inner.lock().dequeue(dest)
    }

    /// Drop stale samples, e.g. when the stream restarts
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Hold the queue lock across several operations
    pub fn lock(&self) -> MutexGuard<'_, CircularQueue<i16>> {
        self.inner.lock()
    }
}

impl From<&AudioConfig> for AudioQueue {
    fn from(config: &AudioConfig) -> Self {
        Self::new(config.queue_capacity)
    }
}
