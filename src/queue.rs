//! Bounded lock-free event queue between GPIO interrupts and the polling loop.
//!
//! This is the only state shared between interrupt context and the main loop.
//!
//! # Architecture
//!
//! ```text
//! GPIO ISR ─── write() ──▶ EventQueue ──── read() ───▶ CSV sink
//!              (producer)   (fixed ring)   (consumer)
//! ```
//!
//! # Rules
//!
//! - Only atomic operations for synchronization, no locks
//! - `write` never blocks and never overwrites unread records
//! - `count` is the single source of truth for full/empty
//! - Single producer context (the GPIO ISR service), single consumer context
//!
//! # Memory Ordering
//!
//! - Producer fills the slot, then publishes it with `count.fetch_add(Release)`
//! - Consumer observes `count` with `Acquire` before reading slots, then
//!   releases them with `count.fetch_sub(Release)`
//! - `write_idx` is owned by the producer, `read_idx` by the consumer

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::record::{Edge, EventRecord, SignalId};

/// Default queue capacity: 4096 records (32 KB).
///
/// At one edge per second on each line this covers well over the
/// 60 s commit interval even with the card missing for a while.
pub const QUEUE_CAPACITY: usize = 4096;

/// Fixed-capacity FIFO of [`EventRecord`]s.
///
/// # Safety
///
/// This type uses `UnsafeCell` internally but is safe to use because:
/// - Only one producer context calls `write` (all signal interrupts are
///   dispatched from one ISR service, so they never preempt each other)
/// - Only one consumer context calls `read`
/// - A slot is handed from producer to consumer only through `count`
pub struct EventQueue<const N: usize = QUEUE_CAPACITY> {
    /// Ring storage.
    slots: UnsafeCell<[EventRecord; N]>,

    /// Next slot to write, always in `0..N`. Producer-owned.
    write_idx: AtomicUsize,

    /// Next slot to read, always in `0..N`. Consumer-owned.
    read_idx: AtomicUsize,

    /// Records written and not yet read.
    count: AtomicUsize,
}

// SAFETY: Single producer, single consumer, atomic hand-off through `count`.
unsafe impl<const N: usize> Sync for EventQueue<N> {}
unsafe impl<const N: usize> Send for EventQueue<N> {}

impl<const N: usize> EventQueue<N> {
    /// Create a new empty queue.
    ///
    /// # Panics
    ///
    /// Panics at compile time if N is zero.
    pub const fn new() -> Self {
        assert!(N > 0, "Queue capacity must be non-zero");

        Self {
            slots: UnsafeCell::new([EventRecord::EMPTY; N]),
            write_idx: AtomicUsize::new(0),
            read_idx: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    /// Append one record.
    ///
    /// Returns `false` and leaves the queue untouched if it is full.
    ///
    /// # Timing
    ///
    /// O(1), no loops, no allocation, no I/O. Safe from interrupt context.
    #[inline]
    pub fn write(&self, signal: SignalId, edge: Edge, timestamp_ms: u32) -> bool {
        if self.count.load(Ordering::Acquire) >= N {
            return false;
        }

        let idx = self.write_idx.load(Ordering::Relaxed);

        // SAFETY: Single producer. The slot at `idx` is free because
        // count < N, and the consumer never touches free slots.
        unsafe {
            (*self.slots.get())[idx] = EventRecord::new(signal, edge, timestamp_ms);
        }

        self.write_idx.store((idx + 1) % N, Ordering::Relaxed);

        // Publish the slot
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    /// Move up to `dest.len()` oldest records into `dest`, in FIFO order.
    ///
    /// Returns the number of records actually read (0 when empty).
    /// Must not be called concurrently with itself.
    #[inline]
    pub fn read(&self, dest: &mut [EventRecord]) -> usize {
        let available = self.count.load(Ordering::Acquire);
        let n = dest.len().min(available);
        if n == 0 {
            return 0;
        }

        let mut idx = self.read_idx.load(Ordering::Relaxed);
        for slot in dest[..n].iter_mut() {
            // SAFETY: Single consumer. Slots in the published range are
            // not written by the producer until count drops below N again.
            *slot = unsafe { (*self.slots.get())[idx] };
            idx = (idx + 1) % N;
        }
        self.read_idx.store(idx, Ordering::Relaxed);

        // Release the slots back to the producer
        self.count.fetch_sub(n, Ordering::Release);
        n
    }

    /// Number of pending records.
    #[inline]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// True when nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// True when the next `write` would be rejected.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count() >= N
    }

    /// Occupancy in permille (0..=1000).
    #[inline]
    pub fn occupancy_permille(&self) -> u16 {
        (self.count() * 1000 / N) as u16
    }

    /// Discard everything and rewind both indices.
    ///
    /// Not safe while a producer may be active: only call during
    /// (re)initialisation with signal interrupts disabled.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        self.write_idx.store(0, Ordering::Relaxed);
        self.read_idx.store(0, Ordering::Relaxed);
    }

    /// Get the queue capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
