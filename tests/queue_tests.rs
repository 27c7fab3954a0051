//! Event queue tests: FIFO order, capacity and concurrent hand-off

use std::thread;

use clock_signal_sniffer::queue::EventQueue;
use clock_signal_sniffer::record::{Edge, EventRecord, SignalId};

fn rec(signal: SignalId, edge: Edge, ts: u32) -> EventRecord {
    EventRecord::new(signal, edge, ts)
}

#[test]
fn test_capacity_four_scenario() {
    let queue = EventQueue::<4>::new();

    assert!(queue.write(SignalId::Rf, Edge::Rising, 10));
    assert!(queue.write(SignalId::Mu, Edge::Falling, 11));
    assert!(queue.write(SignalId::Rf, Edge::Falling, 12));
    assert!(queue.write(SignalId::Rf, Edge::Rising, 13));
    assert!(queue.is_full());

    // 5th write rejected, nothing overwritten
    assert!(!queue.write(SignalId::Mu, Edge::Rising, 14));
    assert_eq!(queue.count(), 4);

    let mut out = [EventRecord::EMPTY; 2];
    assert_eq!(queue.read(&mut out), 2);
    assert_eq!(out, [rec(SignalId::Rf, Edge::Rising, 10), rec(SignalId::Mu, Edge::Falling, 11)]);
    assert_eq!(queue.count(), 2);

    assert!(queue.write(SignalId::Mu, Edge::Rising, 15));

    let mut rest = [EventRecord::EMPTY; 8];
    assert_eq!(queue.read(&mut rest), 3);
    assert_eq!(
        &rest[..3],
        &[
            rec(SignalId::Rf, Edge::Falling, 12),
            rec(SignalId::Rf, Edge::Rising, 13),
            rec(SignalId::Mu, Edge::Rising, 15),
        ]
    );
}

#[test]
fn test_fifo_across_wrap() {
    let queue = EventQueue::<5>::new();
    let mut out = [EventRecord::EMPTY; 3];
    let mut expected_ts = 0;

    // Interleave writes and reads so the indices wrap several times
    for round in 0..10u32 {
        for i in 0..3 {
            assert!(queue.write(SignalId::Br, Edge::Rising, round * 3 + i));
        }
        let n = queue.read(&mut out);
        assert_eq!(n, 3);
        for record in &out[..n] {
            assert_eq!(record.timestamp_ms, expected_ts);
            expected_ts += 1;
        }
    }
    assert!(queue.is_empty());
}

#[test]
fn test_read_empty_and_partial() {
    let queue = EventQueue::<8>::new();
    let mut out = [EventRecord::EMPTY; 4];

    assert_eq!(queue.read(&mut out), 0);

    queue.write(SignalId::Ba, Edge::Falling, 1);
    assert_eq!(queue.read(&mut out), 1);
    assert_eq!(out[0], rec(SignalId::Ba, Edge::Falling, 1));
    assert_eq!(queue.read(&mut out), 0);
}

#[test]
fn test_count_stays_in_bounds() {
    let queue = EventQueue::<3>::new();
    let mut accepted = 0;
    for ts in 0..10 {
        let was_full = queue.count() == queue.capacity();
        let ok = queue.write(SignalId::Mu, Edge::Rising, ts);
        assert_eq!(ok, !was_full);
        accepted += ok as usize;
        assert!(queue.count() <= 3);
    }
    assert_eq!(accepted, 3);
}

#[test]
fn test_occupancy_and_reset() {
    let queue = EventQueue::<10>::new();
    for ts in 0..9 {
        queue.write(SignalId::Rf, Edge::Rising, ts);
    }
    assert_eq!(queue.occupancy_permille(), 900);

    queue.reset();
    assert!(queue.is_empty());
    assert_eq!(queue.occupancy_permille(), 0);

    assert!(queue.write(SignalId::Rf, Edge::Falling, 99));
    let mut out = [EventRecord::EMPTY; 1];
    queue.read(&mut out);
    assert_eq!(out[0].timestamp_ms, 99);
}

#[test]
fn test_concurrent_producer_consumer_preserves_order() {
    const TOTAL: u32 = 20_000;
    let queue = EventQueue::<64>::new();

    thread::scope(|s| {
        s.spawn(|| {
            let mut ts = 0;
            while ts < TOTAL {
                let edge = if ts % 2 == 0 { Edge::Rising } else { Edge::Falling };
                if queue.write(SignalId::Mu, edge, ts) {
                    ts += 1;
                } else {
                    thread::yield_now();
                }
            }
        });

        let mut out = [EventRecord::EMPTY; 16];
        let mut expected = 0;
        while expected < TOTAL {
            let n = queue.read(&mut out);
            if n == 0 {
                thread::yield_now();
                continue;
            }
            for record in &out[..n] {
                assert_eq!(record.timestamp_ms, expected);
                let edge = if expected % 2 == 0 { Edge::Rising } else { Edge::Falling };
                assert_eq!(record.edge, edge);
                expected += 1;
            }
        }
    });

    assert!(queue.is_empty());
}
