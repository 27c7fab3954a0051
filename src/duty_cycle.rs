//! Duty-cycle scheduler for the RF reference line.
//!
//! Arms the managed signal for `active_ms`, then disarms it for
//! `inactive_ms`, forever. Starts disarmed.
//!
//! The scheduler only decides; the polling loop applies the decision to the
//! edge detector and the GPIO interrupt. A stalled caller delays the next
//! transition, there is no catch-up.

use crate::clock;

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DutyPhase {
    /// Managed signal disarmed
    Inactive,
    /// Managed signal armed
    Active,
}

impl DutyPhase {
    /// Whether the managed signal should be armed in this phase.
    #[inline]
    pub fn is_armed(self) -> bool {
        self == DutyPhase::Active
    }
}

/// Two-phase repeating schedule.
#[derive(Debug, Clone)]
pub struct DutyCycleScheduler {
    /// Current phase
    phase: DutyPhase,
    /// Deadline of the next flip (wrapping ms)
    next_transition_ms: u32,
    active_ms: u32,
    inactive_ms: u32,
}

impl DutyCycleScheduler {
    /// Create a scheduler in the inactive phase, flipping at
    /// `now_ms + inactive_ms`.
    pub fn new(active_ms: u32, inactive_ms: u32, now_ms: u32) -> Self {
        Self {
            phase: DutyPhase::Inactive,
            next_transition_ms: now_ms.wrapping_add(inactive_ms),
            active_ms,
            inactive_ms,
        }
    }

    /// Get current phase
    #[inline]
    pub fn phase(&self) -> DutyPhase {
        self.phase
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.phase.is_armed()
    }

    /// Deadline of the next flip.
    #[inline]
    pub fn next_transition_ms(&self) -> u32 {
        self.next_transition_ms
    }

    /// Advance the schedule.
    ///
    /// Flips at most once per call. Returns `Some(new_phase)` when a flip
    /// happened, `None` otherwise.
    ///
    /// Must be called more often than the shorter dwell time.
    pub fn tick(&mut self, now_ms: u32) -> Option<DutyPhase> {
        if !clock::is_due(now_ms, self.next_transition_ms) {
            return None;
        }

        let (phase, dwell) = match self.phase {
            DutyPhase::Inactive => (DutyPhase::Active, self.active_ms),
            DutyPhase::Active => (DutyPhase::Inactive, self.inactive_ms),
        };
        self.phase = phase;
        self.next_transition_ms = now_ms.wrapping_add(dwell);
        Some(phase)
    }

    /// Milliseconds until the next flip, zero if it is already due.
    #[inline]
    pub fn time_until_next_transition(&self, now_ms: u32) -> u32 {
        clock::until(now_ms, self.next_transition_ms)
    }

    /// Total cycle length.
    #[inline]
    pub fn period_ms(&self) -> u32 {
        self.active_ms.saturating_add(self.inactive_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_inactive() {
        let sched = DutyCycleScheduler::new(300, 1500, 0);
        assert_eq!(sched.phase(), DutyPhase::Inactive);
        assert_eq!(sched.next_transition_ms(), 1500);
        assert_eq!(sched.period_ms(), 1800);
    }

    #[test]
    fn test_single_flip_per_tick() {
        let mut sched = DutyCycleScheduler::new(10, 20, 0);

        // Long stall: only one flip, next deadline measured from now
        assert_eq!(sched.tick(1000), Some(DutyPhase::Active));
        assert_eq!(sched.next_transition_ms(), 1010);
        assert_eq!(sched.tick(1001), None);
    }
}
