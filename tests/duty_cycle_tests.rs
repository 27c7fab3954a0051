//! Duty-cycle scheduler tests

use clock_signal_sniffer::duty_cycle::{DutyCycleScheduler, DutyPhase};

const ACTIVE: u32 = 5 * 60 * 1000;
const INACTIVE: u32 = 25 * 60 * 1000;

fn phases_at(start: u32, offsets: &[u32]) -> Vec<DutyPhase> {
    let mut sched = DutyCycleScheduler::new(ACTIVE, INACTIVE, start);
    offsets
        .iter()
        .map(|&offset| {
            sched.tick(start.wrapping_add(offset));
            sched.phase()
        })
        .collect()
}

#[test]
fn test_periodicity() {
    let phases = phases_at(0, &[INACTIVE - 1, INACTIVE, INACTIVE + ACTIVE - 1, INACTIVE + ACTIVE]);
    assert_eq!(
        phases,
        vec![DutyPhase::Inactive, DutyPhase::Active, DutyPhase::Active, DutyPhase::Inactive]
    );
}

#[test]
fn test_tick_reports_flips_only() {
    let mut sched = DutyCycleScheduler::new(100, 400, 0);

    assert_eq!(sched.tick(10), None);
    assert_eq!(sched.tick(400), Some(DutyPhase::Active));
    assert_eq!(sched.tick(400), None);
    assert_eq!(sched.tick(500), Some(DutyPhase::Inactive));
    assert_eq!(sched.tick(899), None);
    assert_eq!(sched.tick(900), Some(DutyPhase::Active));
}

#[test]
fn test_stalled_caller_gets_no_catch_up() {
    let mut sched = DutyCycleScheduler::new(100, 400, 0);

    // Three dwell periods late: only one flip, timed from the late tick
    assert_eq!(sched.tick(1_500), Some(DutyPhase::Active));
    assert_eq!(sched.next_transition_ms(), 1_600);
    assert_eq!(sched.tick(1_550), None);
    assert_eq!(sched.phase(), DutyPhase::Active);
}

#[test]
fn test_wraparound_matches_shifted_timeline() {
    let offsets = [INACTIVE - 1, INACTIVE, INACTIVE + ACTIVE - 1, INACTIVE + ACTIVE, 2 * (INACTIVE + ACTIVE)];
    let reference = phases_at(1_000, &offsets);

    assert_eq!(phases_at(u32::MAX - 10, &offsets), reference);
    assert_eq!(phases_at(u32::MAX - INACTIVE, &offsets), reference);
}

#[test]
fn test_time_until_next_transition() {
    let start = u32::MAX - 50;
    let mut sched = DutyCycleScheduler::new(100, 400, start);

    assert_eq!(sched.time_until_next_transition(start), 400);
    assert_eq!(sched.time_until_next_transition(start.wrapping_add(399)), 1);
    assert_eq!(sched.time_until_next_transition(start.wrapping_add(400)), 0);
    // Overdue never reads as a huge remaining time
    assert_eq!(sched.time_until_next_transition(start.wrapping_add(10_000)), 0);

    sched.tick(start.wrapping_add(400));
    assert_eq!(sched.time_until_next_transition(start.wrapping_add(400)), 100);
}

#[test]
fn test_period() {
    let sched = DutyCycleScheduler::new(ACTIVE, INACTIVE, 0);
    assert_eq!(sched.period_ms(), 30 * 60 * 1000);
}
