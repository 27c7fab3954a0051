//! Debounced edge detector.
//!
//! Turns raw "pin changed" notifications from the GPIO ISR into validated
//! [`EventRecord`]s and pushes them into the [`EventQueue`].
//!
//! # Filtering
//!
//! For each notification `(signal, level, now)`:
//! 1. Disarmed signal: ignored.
//! 2. Same level as the last recorded one: spurious retrigger, ignored.
//! 3. Less than or equal to `min_pulse_ms` since the last accepted edge on
//!    that signal: glitch, ignored. The first edge after start-up has no
//!    reference time and always passes this check.
//! 4. Otherwise the edge is recorded and submitted to the queue. A full
//!    queue loses exactly that edge; it is counted, never retried.
//!
//! # Contexts
//!
//! `on_level_change` runs in interrupt context and only touches the slot of
//! its own signal plus the queue's producer side. `set_armed` is called from
//! the polling loop; the armed flag is the only per-signal state shared with
//! it. Debounce state survives disarm/rearm cycles.
//!
//! # Interrupt dispatch
//!
//! GPIO interrupt handlers carry no context, so one detector is registered
//! process-wide with [`EdgeDetector::register`] and reached through
//! [`dispatch_edge`]. Only one detector may be live at a time.

use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, Ordering};

use crate::clock;
use crate::config::DUTY_CYCLED_SIGNAL;
use crate::health::CaptureStats;
use crate::log_globals::ISR_LOG;
use crate::queue::{EventQueue, QUEUE_CAPACITY};
use crate::record::{EventRecord, Level, SignalId, SIGNAL_COUNT};

/// Default minimum pulse width: the resolution of the millisecond clock.
pub const MIN_PULSE_WIDTH_MS: u32 = 1;

/// What happened to one notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Accepted and queued.
    Recorded(EventRecord),
    /// Signal not armed.
    Disarmed,
    /// Level already recorded.
    Redundant,
    /// Too close to the previous accepted edge.
    Glitch,
    /// Valid edge lost because the queue was full.
    Dropped(EventRecord),
}

/// Per-signal debounce and arming state.
struct SignalSlot {
    armed: AtomicBool,
    last_high: AtomicBool,
    last_change_ms: AtomicU32,
    /// False until the first edge is accepted (no reference time yet).
    has_prior: AtomicBool,
}

impl SignalSlot {
    const IDLE: Self = Self {
        armed: AtomicBool::new(false),
        last_high: AtomicBool::new(true),
        last_change_ms: AtomicU32::new(0),
        has_prior: AtomicBool::new(false),
    };
}

/// Edge detector for the four monitored lines.
///
/// # Example
///
/// ```ignore
/// static QUEUE: EventQueue = EventQueue::new();
/// static STATS: CaptureStats = CaptureStats::new();
/// static DETECTOR: EdgeDetector = EdgeDetector::new(&QUEUE, &STATS, MIN_PULSE_WIDTH_MS);
///
/// DETECTOR.begin(inputs.read_levels());
/// DETECTOR.register()?;
/// ```
pub struct EdgeDetector<'q, const N: usize = QUEUE_CAPACITY> {
    queue: &'q EventQueue<N>,
    stats: &'q CaptureStats,
    slots: [SignalSlot; SIGNAL_COUNT],
    min_pulse_ms: u32,
}

impl<'q, const N: usize> EdgeDetector<'q, N> {
    /// Create a detector with every signal disarmed.
    pub const fn new(queue: &'q EventQueue<N>, stats: &'q CaptureStats, min_pulse_ms: u32) -> Self {
        Self {
            queue,
            stats,
            slots: [SignalSlot::IDLE; SIGNAL_COUNT],
            min_pulse_ms,
        }
    }

    /// Seed the known levels from an actual pin read and arm the
    /// always-on signals. The duty-cycled signal starts disarmed.
    ///
    /// Call before the signal interrupts are enabled.
    pub fn begin(&self, levels: [Level; SIGNAL_COUNT]) {
        for signal in SignalId::ALL {
            let slot = &self.slots[signal.index()];
            slot.last_high.store(levels[signal.index()].is_high(), Ordering::Relaxed);
            slot.last_change_ms.store(0, Ordering::Relaxed);
            slot.has_prior.store(false, Ordering::Relaxed);
            slot.armed.store(signal != DUTY_CYCLED_SIGNAL, Ordering::Release);
        }
    }

    /// Arm or disarm one signal.
    ///
    /// Idempotent. Returns `true` if the state changed, so the caller knows
    /// whether the hardware interrupt has to be toggled as well.
    #[inline]
    pub fn set_armed(&self, signal: SignalId, armed: bool) -> bool {
        self.slots[signal.index()].armed.swap(armed, Ordering::AcqRel) != armed
    }

    #[inline]
    pub fn is_armed(&self, signal: SignalId) -> bool {
        self.slots[signal.index()].armed.load(Ordering::Acquire)
    }

    /// Handle a level-change notification.
    ///
    /// # Timing
    ///
    /// O(1), never blocks, never allocates. Interrupt context only.
    pub fn on_level_change(&self, signal: SignalId, level: Level, now_ms: u32) -> EdgeOutcome {
        let slot = &self.slots[signal.index()];

        if !slot.armed.load(Ordering::Acquire) {
            self.stats.record_disarmed();
            return EdgeOutcome::Disarmed;
        }

        if slot.last_high.load(Ordering::Relaxed) == level.is_high() {
            self.stats.record_redundant();
            return EdgeOutcome::Redundant;
        }

        if slot.has_prior.load(Ordering::Relaxed)
            && clock::elapsed(now_ms, slot.last_change_ms.load(Ordering::Relaxed)) <= self.min_pulse_ms
        {
            self.stats.record_glitch();
            return EdgeOutcome::Glitch;
        }

        slot.last_high.store(level.is_high(), Ordering::Relaxed);
        slot.last_change_ms.store(now_ms, Ordering::Relaxed);
        slot.has_prior.store(true, Ordering::Relaxed);

        let record = EventRecord::new(signal, level.arriving_edge(), now_ms);
        if self.queue.write(record.signal, record.edge, record.timestamp_ms) {
            self.stats.record_accepted();
            EdgeOutcome::Recorded(record)
        } else {
            // Report once per overflow episode
            if !self.stats.overflowed() {
                crate::isr_warn!(ISR_LOG, now_ms, "queue full, {} {} edge lost", signal, record.edge.code());
            }
            self.stats.record_drop();
            EdgeOutcome::Dropped(record)
        }
    }

    /// Queue this detector writes to.
    pub fn queue(&self) -> &'q EventQueue<N> {
        self.queue
    }
}

/// Returned when a second detector tries to register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlreadyRegistered;

impl core::fmt::Display for AlreadyRegistered {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("an edge detector is already registered")
    }
}

impl std::error::Error for AlreadyRegistered {}

static REGISTERED: AtomicPtr<EdgeDetector<'static>> = AtomicPtr::new(ptr::null_mut());

impl EdgeDetector<'static> {
    /// Make this detector the target of [`dispatch_edge`].
    pub fn register(&'static self) -> Result<(), AlreadyRegistered> {
        REGISTERED
            .compare_exchange(
                ptr::null_mut(),
                self as *const Self as *mut Self,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| AlreadyRegistered)
    }
}

/// The registered detector, if any.
#[inline]
pub fn registered() -> Option<&'static EdgeDetector<'static>> {
    // SAFETY: Only `&'static EdgeDetector` values are ever stored.
    unsafe { REGISTERED.load(Ordering::Acquire).as_ref() }
}

/// Context-free entry point for GPIO interrupt handlers.
///
/// Returns `None` when no detector is registered yet.
#[inline]
pub fn dispatch_edge(signal: SignalId, level: Level, now_ms: u32) -> Option<EdgeOutcome> {
    registered().map(|detector| detector.on_level_change(signal, level, now_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Edge;

    const LOW: [Level; SIGNAL_COUNT] = [Level::Low; SIGNAL_COUNT];

    #[test]
    fn test_begin_arms_all_but_duty_cycled() {
        let queue = EventQueue::<8>::new();
        let stats = CaptureStats::new();
        let detector = EdgeDetector::new(&queue, &stats, MIN_PULSE_WIDTH_MS);

        detector.begin(LOW);

        assert!(!detector.is_armed(SignalId::Rf));
        assert!(detector.is_armed(SignalId::Mu));
        assert!(detector.is_armed(SignalId::Br));
        assert!(detector.is_armed(SignalId::Ba));
    }

    #[test]
    fn test_first_edge_bypasses_pulse_filter() {
        let queue = EventQueue::<8>::new();
        let stats = CaptureStats::new();
        let detector = EdgeDetector::new(&queue, &stats, MIN_PULSE_WIDTH_MS);
        detector.begin(LOW);

        let outcome = detector.on_level_change(SignalId::Mu, Level::High, 0);
        assert_eq!(
            outcome,
            EdgeOutcome::Recorded(EventRecord::new(SignalId::Mu, Edge::Rising, 0))
        );
    }

    #[test]
    fn test_disarmed_signal_ignored() {
        let queue = EventQueue::<8>::new();
        let stats = CaptureStats::new();
        let detector = EdgeDetector::new(&queue, &stats, MIN_PULSE_WIDTH_MS);
        detector.begin(LOW);

        assert_eq!(detector.on_level_change(SignalId::Rf, Level::High, 10), EdgeOutcome::Disarmed);
        assert!(queue.is_empty());
        assert_eq!(stats.snapshot().disarmed, 1);
    }

    #[test]
    fn test_set_armed_idempotent() {
        let queue = EventQueue::<8>::new();
        let stats = CaptureStats::new();
        let detector = EdgeDetector::new(&queue, &stats, MIN_PULSE_WIDTH_MS);
        detector.begin(LOW);

        assert!(detector.set_armed(SignalId::Rf, true));
        assert!(!detector.set_armed(SignalId::Rf, true));
        assert!(detector.set_armed(SignalId::Rf, false));
        assert!(!detector.set_armed(SignalId::Rf, false));
    }

    #[test]
    fn test_full_queue_drops_and_latches() {
        let queue = EventQueue::<1>::new();
        let stats = CaptureStats::new();
        let detector = EdgeDetector::new(&queue, &stats, MIN_PULSE_WIDTH_MS);
        detector.begin(LOW);

        assert!(matches!(
            detector.on_level_change(SignalId::Br, Level::High, 10),
            EdgeOutcome::Recorded(_)
        ));
        assert_eq!(
            detector.on_level_change(SignalId::Br, Level::Low, 20),
            EdgeOutcome::Dropped(EventRecord::new(SignalId::Br, Edge::Falling, 20))
        );
        assert!(stats.overflowed());
        assert_eq!(stats.dropped(), 1);
        assert_eq!(queue.count(), 1);
    }
}
