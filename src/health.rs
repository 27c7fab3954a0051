//! Capture health counters.
//!
//! # Philosophy
//!
//! > Noise is filtered, overflow is counted, nothing ever stops capture.
//!
//! The edge detector updates these from interrupt context, the polling loop
//! reads them to decide what the status LED shows. Nothing here feeds back
//! into capture.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Thread-safe capture counters.
///
/// # Usage
///
/// ```ignore
/// static STATS: CaptureStats = CaptureStats::new();
///
/// // In the edge ISR:
/// if !queue.write(signal, edge, now) {
///     STATS.record_drop();
/// }
///
/// // In the main loop:
/// if STATS.overflowed() {
///     indicator.set_status(SystemStatus::BufferOverflow);
/// }
/// ```
pub struct CaptureStats {
    /// Edges accepted into the queue.
    recorded: AtomicU32,

    /// Notifications repeating the already-recorded level.
    redundant: AtomicU32,

    /// Transitions faster than the minimum pulse width.
    glitches: AtomicU32,

    /// Notifications that arrived while the signal was disarmed.
    disarmed: AtomicU32,

    /// Valid edges lost because the queue was full.
    dropped: AtomicU32,

    /// Latched when the queue has been seen at 100 % occupancy.
    overflowed: AtomicBool,
}

impl CaptureStats {
    /// Create zeroed counters.
    pub const fn new() -> Self {
        Self {
            recorded: AtomicU32::new(0),
            redundant: AtomicU32::new(0),
            glitches: AtomicU32::new(0),
            disarmed: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            overflowed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn record_accepted(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_redundant(&self) {
        self.redundant.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_glitch(&self) {
        self.glitches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_disarmed(&self) {
        self.disarmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one lost edge and latch the overflow flag.
    #[inline]
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.overflowed.store(true, Ordering::Release);
    }

    /// Latch the overflow flag without counting a loss (queue seen full).
    #[inline]
    pub fn mark_full(&self) {
        self.overflowed.store(true, Ordering::Release);
    }

    /// True if the queue was full since the last clear.
    #[inline]
    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }

    /// Clear the overflow latch (after the backlog was persisted).
    ///
    /// Counters are kept for diagnostics.
    #[inline]
    pub fn clear_overflow(&self) {
        self.overflowed.store(false, Ordering::Release);
    }

    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            recorded: self.recorded.load(Ordering::Relaxed),
            redundant: self.redundant.load(Ordering::Relaxed),
            glitches: self.glitches.load(Ordering::Relaxed),
            disarmed: self.disarmed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            overflowed: self.overflowed(),
        }
    }
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the capture counters at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub recorded: u32,
    pub redundant: u32,
    pub glitches: u32,
    pub disarmed: u32,
    pub dropped: u32,
    pub overflowed: bool,
}

impl StatsSnapshot {
    /// Notifications rejected as noise.
    pub fn filtered(&self) -> u32 {
        self.redundant.saturating_add(self.glitches)
    }
}

/// The three health facts the polling loop hands to the status indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthReport {
    /// Queue occupancy, 0..=1000.
    pub occupancy_permille: u16,
    /// Outcome of the last persistence attempt, `None` before the first one.
    pub last_persist_ok: Option<bool>,
    /// Queue reached 100 % occupancy since the last successful flush.
    pub overflowed: bool,
    pub stats: StatsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let stats = CaptureStats::new();
        assert!(!stats.overflowed());

        stats.record_accepted();
        stats.record_redundant();
        stats.record_glitch();
        stats.record_glitch();

        let snap = stats.snapshot();
        assert_eq!(snap.recorded, 1);
        assert_eq!(snap.filtered(), 3);
        assert!(!snap.overflowed);
    }

    #[test]
    fn test_overflow_latch() {
        let stats = CaptureStats::new();

        stats.record_drop();
        stats.record_drop();
        assert!(stats.overflowed());
        assert_eq!(stats.dropped(), 2);

        stats.clear_overflow();
        assert!(!stats.overflowed());
        assert_eq!(stats.dropped(), 2); // Count preserved
    }

    #[test]
    fn test_full_queue_latches_without_loss() {
        let stats = CaptureStats::new();

        stats.mark_full();
        assert!(stats.overflowed());
        assert_eq!(stats.dropped(), 0);
        assert!(stats.snapshot().overflowed);
    }
}
