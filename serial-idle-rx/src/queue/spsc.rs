//! Lock-free single-producer single-consumer (SPSC) byte ring.
//!
//! Designed for ISR-safe hand-off between the reception interrupt and the
//! application's draining loop. Uses atomic indices for lock-free
//! synchronization and copies in bulk, at most two `memcpy`s per call.
//!
//! # Safety Contract
//!
//! - Only ONE context may push (the "producer").
//! - Only ONE context may pop (the "consumer").
//! - These may be different threads/ISR contexts running concurrently.
//!
//! [`ByteQueue::split()`] enforces the contract at compile time by handing
//! out exactly one [`Producer`] and one [`Consumer`]. The queue itself only
//! exposes read-only queries; pushing and popping go through the halves.
//!
//! ```compile_fail
//! use serial_idle_rx::queue::ByteQueue;
//!
//! let q: ByteQueue<8> = ByteQueue::new();
//! q.push_slice(b"no producer");
//! ```

use core::cell::UnsafeCell;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free SPSC byte queue.
///
/// The usable capacity is `N - 1` (one slot is reserved for full/empty
/// disambiguation via the Lamport queue algorithm).
///
/// # Type Parameters
///
/// - `N`: Total number of slots. Usable capacity is `N - 1`. Must be ≥ 2.
pub struct ByteQueue<const N: usize> {
    buffer: UnsafeCell<[u8; N]>,
    /// Write position (only modified by the producer).
    head: AtomicUsize,
    /// Read position (only modified by the consumer).
    tail: AtomicUsize,
}

// SAFETY: The SPSC contract ensures head and tail are only modified by their
// respective sides. The producer only writes slots in [head, tail - 1) and the
// consumer only reads slots in [tail, head), so the two never touch the same
// byte, and acquire/release ordering on the indices publishes the copies.
unsafe impl<const N: usize> Sync for ByteQueue<N> {}

impl<const N: usize> ByteQueue<N> {
    /// Create a new empty queue.
    ///
    /// # Panics
    ///
    /// If `N` is less than 2 (usable capacity is `N - 1`).
    pub const fn new() -> Self {
        assert!(N >= 2, "byte queue must have at least 2 slots (1 usable)");

        ByteQueue {
            buffer: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Split into the producer and consumer halves.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let queue: &Self = self;
        (Producer { queue }, Consumer { queue })
    }

    /// Usable capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Free space in bytes.
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire) == self.head.load(Ordering::Acquire)
    }

    /// Check if the queue is full.
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + 1) % N == tail
    }

    /// Copy as much of `data` as fits. Only the [`Producer`] calls this.
    fn push_slice(&self, data: &[u8]) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        let free = (tail + N - head - 1) % N;
        let n = data.len().min(free);
        if n == 0 {
            return 0;
        }

        let first = n.min(N - head);
        let base = self.buffer.get() as *mut u8;
        // SAFETY: We are the sole producer. Slots [head, head + n) modulo N
        // are free (n <= free), so the consumer is not reading them.
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), base.add(head), first);
            ptr::copy_nonoverlapping(data.as_ptr().add(first), base, n - first);
        }

        // Release ordering ensures the copies are visible before head advances.
        self.head.store((head + n) % N, Ordering::Release);
        n
    }

    /// Copy up to `out.len()` queued bytes into `out`. Only the
    /// [`Consumer`] calls this.
    fn pop_slice(&self, out: &mut [u8]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        let len = (head + N - tail) % N;
        let n = out.len().min(len);
        if n == 0 {
            return 0;
        }

        let first = n.min(N - tail);
        let base = self.buffer.get() as *const u8;
        // SAFETY: We are the sole consumer. Slots [tail, tail + n) modulo N
        // hold bytes published by the producer's release store on head.
        unsafe {
            ptr::copy_nonoverlapping(base.add(tail), out.as_mut_ptr(), first);
            ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(first), n - first);
        }

        // Release ordering ensures the reads complete before tail advances,
        // freeing the slots for the producer.
        self.tail.store((tail + n) % N, Ordering::Release);
        n
    }

    fn pop(&self) -> Option<u8> {
        let mut byte = [0u8; 1];
        (self.pop_slice(&mut byte) == 1).then_some(byte[0])
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The producer half of a [`ByteQueue`]. Implements [`RxSink`](crate::RxSink).
pub struct Producer<'a, const N: usize> {
    queue: &'a ByteQueue<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Copy as much of `data` as fits; returns the number of bytes queued.
    pub fn push_slice(&mut self, data: &[u8]) -> usize {
        self.queue.push_slice(data)
    }

    /// Free space in bytes.
    pub fn free(&self) -> usize {
        self.queue.free()
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// The consumer half of a [`ByteQueue`]. Implements [`embedded_io::Read`].
pub struct Consumer<'a, const N: usize> {
    queue: &'a ByteQueue<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Copy up to `out.len()` queued bytes into `out`; returns the count.
    pub fn pop_slice(&mut self, out: &mut [u8]) -> usize {
        self.queue.pop_slice(out)
    }

    /// Pop a single byte.
    pub fn pop(&mut self) -> Option<u8> {
        self.queue.pop()
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
