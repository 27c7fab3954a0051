//! Forwards the ISR log ring to the `log` facade.
//!
//! Runs in the polling loop, where blocking on the UART is acceptable.
//! On device the facade is backed by `EspLogger`.

use crate::clock;
use crate::logging::{LogEntry, LogStream};

/// How often dropped-entry counts are reported.
pub const DROPPED_REPORT_INTERVAL_MS: u32 = 10_000;

/// Format log entry payload.
///
/// Format: `[timestamp_ms] message`
fn format_log_entry(entry: &LogEntry) -> String {
    format!("[{:10}] {}", entry.timestamp_ms, entry.message())
}

/// Drains a [`LogStream`] into `log` and reports drops periodically.
pub struct LogDrain {
    last_dropped_report_ms: u32,
}

impl LogDrain {
    pub fn new(now_ms: u32) -> Self {
        Self {
            last_dropped_report_ms: now_ms,
        }
    }

    /// Forward every pending entry. Returns how many were forwarded.
    pub fn drain<const N: usize>(&mut self, stream: &LogStream<N>, now_ms: u32) -> usize {
        let mut forwarded = 0;
        while let Some(entry) = stream.drain() {
            log::log!(target: "isr", entry.level.to_log(), "{}", format_log_entry(&entry));
            forwarded += 1;
        }

        if clock::elapsed(now_ms, self.last_dropped_report_ms) >= DROPPED_REPORT_INTERVAL_MS {
            let dropped = stream.take_dropped();
            if dropped > 0 {
                log::warn!(target: "isr", "Dropped {} ISR log entries", dropped);
            }
            self.last_dropped_report_ms = now_ms;
        }

        forwarded
    }
}
