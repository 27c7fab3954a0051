//! Polling driver.
//!
//! One [`Supervisor::poll`] call is one iteration of the main loop. It is
//! the single consumer of the event queue and of the ISR log ring.
//!
//! Order per iteration:
//! 1. Blink the status LED
//! 2. Forward ISR log entries to `log`
//! 3. Tick the duty-cycle scheduler and apply its arming decision
//! 4. Regular commit while the duty-cycled signal is disarmed
//! 5. Emergency flush once occupancy crosses the threshold

use crate::clock;
use crate::config::{TimingConfig, DUTY_CYCLED_SIGNAL};
use crate::detector::EdgeDetector;
use crate::duty_cycle::{DutyCycleScheduler, DutyPhase};
use crate::health::{CaptureStats, HealthReport};
use crate::log_drain::LogDrain;
use crate::logging::LogStream;
use crate::queue::{EventQueue, QUEUE_CAPACITY};
use crate::sink::{CsvSink, SinkError, Storage};
use crate::status::{RgbLed, StatusIndicator, SystemStatus};

/// Why records were written during a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Commit interval elapsed outside the active window
    Commit,
    /// Queue crossed the emergency threshold
    Emergency,
}

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// New arming state of the duty-cycled signal. `Some` only when it
    /// changed, so the caller can toggle the hardware interrupt.
    pub arming_changed: Option<bool>,
    /// Set when a persistence attempt was made.
    pub flush: Option<FlushReason>,
    /// Records appended to storage.
    pub records_written: usize,
}

/// Owns the consumer side of the capture pipeline.
pub struct Supervisor<'a, S: Storage, L: RgbLed, const N: usize = QUEUE_CAPACITY> {
    detector: &'a EdgeDetector<'a, N>,
    stats: &'a CaptureStats,
    isr_log: &'a LogStream,
    scheduler: DutyCycleScheduler,
    sink: CsvSink<S>,
    status: StatusIndicator<L>,
    log_drain: LogDrain,
    timing: TimingConfig,
    last_commit_ms: u32,
    last_persist_ok: Option<bool>,
}

impl<'a, S: Storage, L: RgbLed, const N: usize> Supervisor<'a, S, L, N> {
    /// Build the driver. The scheduler starts in its inactive window.
    ///
    /// Shows [`SystemStatus::StorageUnavailable`] straight away when the
    /// card is missing.
    pub fn new(
        detector: &'a EdgeDetector<'a, N>,
        stats: &'a CaptureStats,
        isr_log: &'a LogStream,
        mut sink: CsvSink<S>,
        led: L,
        timing: TimingConfig,
        now_ms: u32,
    ) -> Self {
        let mut status = StatusIndicator::new(led, now_ms);
        if !sink.is_card_present() {
            log::warn!("SD card not available, buffering in RAM");
            status.set_status(SystemStatus::StorageUnavailable, now_ms);
        }

        Self {
            detector,
            stats,
            isr_log,
            scheduler: DutyCycleScheduler::new(timing.rf_active_ms, timing.rf_inactive_ms, now_ms),
            sink,
            status,
            log_drain: LogDrain::new(now_ms),
            timing,
            last_commit_ms: now_ms,
            last_persist_ok: None,
        }
    }

    /// Run one loop iteration.
    pub fn poll(&mut self, now_ms: u32) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        self.status.update(now_ms);
        self.log_drain.drain(self.isr_log, now_ms);

        if let Some(phase) = self.scheduler.tick(now_ms) {
            let armed = phase.is_armed();
            if self.detector.set_armed(DUTY_CYCLED_SIGNAL, armed) {
                outcome.arming_changed = Some(armed);
            }
            match phase {
                DutyPhase::Active => log::info!("{} monitoring started", DUTY_CYCLED_SIGNAL),
                DutyPhase::Inactive => log::info!("{} monitoring stopped", DUTY_CYCLED_SIGNAL),
            }
        }

        let queue = self.detector.queue();
        if queue.is_full() && !self.stats.overflowed() {
            log::warn!("Event queue full");
            self.stats.mark_full();
        }

        if !self.detector.is_armed(DUTY_CYCLED_SIGNAL)
            && clock::elapsed(now_ms, self.last_commit_ms) >= self.timing.commit_interval_ms
        {
            if !queue.is_empty() {
                outcome.records_written += self.persist(queue, now_ms, FlushReason::Commit);
                outcome.flush = Some(FlushReason::Commit);
            }
            self.last_commit_ms = now_ms;
        }

        if queue.occupancy_permille() >= u16::from(self.timing.emergency_flush_pct) * 10 {
            if self.sink.is_card_present() {
                outcome.records_written += self.persist(queue, now_ms, FlushReason::Emergency);
                outcome.flush = Some(FlushReason::Emergency);
            }
            if queue.is_full() {
                self.status.set_status(SystemStatus::BufferOverflow, now_ms);
            }
        }

        outcome
    }

    fn persist(&mut self, queue: &EventQueue<N>, now_ms: u32, reason: FlushReason) -> usize {
        let report = self.sink.drain_and_persist(queue);
        self.last_persist_ok = Some(report.success());

        match &report.error {
            None => {
                log::debug!("{:?} flush: {} records written", reason, report.records_written);
                self.stats.clear_overflow();
                self.status.set_status(SystemStatus::Ok, now_ms);
            }
            Some(SinkError::CardMissing) => {
                log::warn!("{:?} flush skipped: SD card not available", reason);
                self.status.set_status(SystemStatus::StorageUnavailable, now_ms);
            }
            Some(e) => {
                log::error!(
                    "{:?} flush failed after {} records: {} ({} lost)",
                    reason,
                    report.records_written,
                    e,
                    report.records_lost
                );
            }
        }

        report.records_written
    }

    /// Current health facts.
    pub fn health(&self) -> HealthReport {
        let queue = self.detector.queue();
        HealthReport {
            occupancy_permille: queue.occupancy_permille(),
            last_persist_ok: self.last_persist_ok,
            overflowed: self.stats.overflowed() || queue.is_full(),
            stats: self.stats.snapshot(),
        }
    }

    #[inline]
    pub fn status(&self) -> SystemStatus {
        self.status.status()
    }

    #[inline]
    pub fn scheduler(&self) -> &DutyCycleScheduler {
        &self.scheduler
    }

    pub fn sink(&self) -> &CsvSink<S> {
        &self.sink
    }

    pub fn led(&self) -> &L {
        self.status.led()
    }
}
