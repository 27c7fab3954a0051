//! Wrapping millisecond clock.
//!
//! Every interval in the capture pipeline is computed on a free-running
//! `u32` millisecond counter that rolls over after ~49.7 days. All helpers
//! here use unsigned wrapping subtraction, so a deadline that straddles the
//! rollover compares the same as one that does not.
//!
//! Deadlines are valid up to half the counter range (~24.8 days) ahead.

/// Milliseconds elapsed from `since` to `now`, across rollover.
#[inline]
pub const fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// True once `now` has reached or passed `deadline`.
#[inline]
pub const fn is_due(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// Milliseconds remaining until `deadline`, saturating at zero.
#[inline]
pub const fn until(now: u32, deadline: u32) -> u32 {
    if is_due(now, deadline) {
        0
    } else {
        deadline.wrapping_sub(now)
    }
}

/// Current millisecond counter.
///
/// Safe to call from GPIO interrupt context.
#[cfg(target_os = "espidf")]
#[inline]
pub fn millis() -> u32 {
    // SAFETY: esp_timer_get_time has no preconditions and is ISR-safe.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    (us / 1000) as u32
}

/// Host version: milliseconds since first call.
#[cfg(not(target_os = "espidf"))]
pub fn millis() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_across_rollover() {
        assert_eq!(elapsed(5, u32::MAX - 4), 10);
        assert_eq!(elapsed(110, 100), 10);
    }

    #[test]
    fn test_is_due_boundaries() {
        assert!(!is_due(99, 100));
        assert!(is_due(100, 100));
        assert!(is_due(101, 100));
    }

    #[test]
    fn test_is_due_across_rollover() {
        let deadline = 3u32; // scheduled 10ms after u32::MAX - 6
        assert!(!is_due(u32::MAX - 1, deadline));
        assert!(is_due(3, deadline));
        assert!(is_due(10, deadline));
    }

    #[test]
    fn test_until_saturates() {
        assert_eq!(until(90, 100), 10);
        assert_eq!(until(100, 100), 0);
        assert_eq!(until(150, 100), 0);
        assert_eq!(until(u32::MAX, 4), 5);
    }

    #[test]
    fn test_millis_monotonic_on_host() {
        let a = millis();
        let b = millis();
        assert!(elapsed(b, a) < 1000);
    }
}
