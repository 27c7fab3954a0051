//! Module: config
//!
//! Purpose: Runtime configuration for the sniffer.
//!
//! Architecture:
//! - `CONFIG`: single static of atomics, readable from any context
//! - `pins`: fixed board wiring
//! - `nvs`: versioned persistence of the timing parameters
//!
//! Safety: ISR-safe. All access via atomics, no locks.

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::record::SignalId;

pub mod nvs;
pub mod pins;

/// The signal whose monitoring window is duty-cycled.
pub const DUTY_CYCLED_SIGNAL: SignalId = SignalId::Rf;

/// RF armed window: 5 minutes.
pub const DEFAULT_RF_ACTIVE_MS: u32 = 5 * 60 * 1000;

/// RF disarmed window: 25 minutes (30 minute cycle).
pub const DEFAULT_RF_INACTIVE_MS: u32 = 25 * 60 * 1000;

/// Regular SD commit interval: 1 minute.
pub const DEFAULT_COMMIT_INTERVAL_MS: u32 = 60 * 1000;

/// Minimum pulse width in ms (clock resolution).
pub const DEFAULT_MIN_PULSE_WIDTH_MS: u32 = crate::detector::MIN_PULSE_WIDTH_MS;

/// Queue occupancy that triggers an emergency flush.
pub const DEFAULT_EMERGENCY_FLUSH_PCT: u8 = 90;

/// Records drained from the queue per read.
pub const DRAIN_BATCH_SIZE: usize = 64;

/// Log file on the SD card.
pub const DATA_FILE_PATH: &str = "data.csv";

/// First line of a fresh log file.
pub const CSV_HEADER: &str = "Signal,Edge,Timestamp";

/// Mount point of the SD card FAT volume.
pub const SD_MOUNT_POINT: &str = "/sdcard";

/// Minimum gap between SD mount attempts while no card is mounted.
pub const SD_MOUNT_RETRY_MS: u32 = 2_000;

/// Main loop poll period.
pub const POLL_PERIOD_MS: u32 = 10;

/// Lock-free sniffer configuration.
pub struct SnifferConfig {
    pub rf_active_ms: AtomicU32,
    pub rf_inactive_ms: AtomicU32,
    pub commit_interval_ms: AtomicU32,
    pub min_pulse_width_ms: AtomicU32,
    pub emergency_flush_pct: AtomicU8,
    /// Incremented on every change.
    pub generation: AtomicU16,
}

/// Plain copy of the timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub rf_active_ms: u32,
    pub rf_inactive_ms: u32,
    pub commit_interval_ms: u32,
    pub min_pulse_width_ms: u32,
    pub emergency_flush_pct: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            rf_active_ms: DEFAULT_RF_ACTIVE_MS,
            rf_inactive_ms: DEFAULT_RF_INACTIVE_MS,
            commit_interval_ms: DEFAULT_COMMIT_INTERVAL_MS,
            min_pulse_width_ms: DEFAULT_MIN_PULSE_WIDTH_MS,
            emergency_flush_pct: DEFAULT_EMERGENCY_FLUSH_PCT,
        }
    }
}

/// Why a timing set was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A dwell or interval is zero.
    ZeroDuration,
    /// A duration does not fit the wrapping clock's comparison window.
    TooLong,
    /// Emergency threshold outside 1..=100.
    ThresholdOutOfRange,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroDuration => f.write_str("duration must be non-zero"),
            Self::TooLong => f.write_str("duration exceeds half the clock range"),
            Self::ThresholdOutOfRange => f.write_str("emergency threshold must be 1..=100"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Check a timing set before applying it.
pub fn validate_timing(timing: &TimingConfig) -> Result<(), ConfigError> {
    let durations = [timing.rf_active_ms, timing.rf_inactive_ms, timing.commit_interval_ms];
    if durations.iter().any(|&d| d == 0) {
        return Err(ConfigError::ZeroDuration);
    }
    if durations.iter().any(|&d| d > i32::MAX as u32) || timing.min_pulse_width_ms > i32::MAX as u32 {
        return Err(ConfigError::TooLong);
    }
    if timing.emergency_flush_pct == 0 || timing.emergency_flush_pct > 100 {
        return Err(ConfigError::ThresholdOutOfRange);
    }
    Ok(())
}

impl SnifferConfig {
    pub const fn new() -> Self {
        Self {
            rf_active_ms: AtomicU32::new(DEFAULT_RF_ACTIVE_MS),
            rf_inactive_ms: AtomicU32::new(DEFAULT_RF_INACTIVE_MS),
            commit_interval_ms: AtomicU32::new(DEFAULT_COMMIT_INTERVAL_MS),
            min_pulse_width_ms: AtomicU32::new(DEFAULT_MIN_PULSE_WIDTH_MS),
            emergency_flush_pct: AtomicU8::new(DEFAULT_EMERGENCY_FLUSH_PCT),
            generation: AtomicU16::new(0),
        }
    }

    /// Read the current timing parameters.
    pub fn timing(&self) -> TimingConfig {
        TimingConfig {
            rf_active_ms: self.rf_active_ms.load(Ordering::Relaxed),
            rf_inactive_ms: self.rf_inactive_ms.load(Ordering::Relaxed),
            commit_interval_ms: self.commit_interval_ms.load(Ordering::Relaxed),
            min_pulse_width_ms: self.min_pulse_width_ms.load(Ordering::Relaxed),
            emergency_flush_pct: self.emergency_flush_pct.load(Ordering::Relaxed),
        }
    }

    /// Validate and store a timing set, bumping the generation.
    pub fn apply(&self, timing: &TimingConfig) -> Result<(), ConfigError> {
        validate_timing(timing)?;
        self.rf_active_ms.store(timing.rf_active_ms, Ordering::Relaxed);
        self.rf_inactive_ms.store(timing.rf_inactive_ms, Ordering::Relaxed);
        self.commit_interval_ms.store(timing.commit_interval_ms, Ordering::Relaxed);
        self.min_pulse_width_ms.store(timing.min_pulse_width_ms, Ordering::Relaxed);
        self.emergency_flush_pct.store(timing.emergency_flush_pct, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    #[inline]
    pub fn generation(&self) -> u16 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Global configuration.
pub static CONFIG: SnifferConfig = SnifferConfig::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_thirty_minute_cycle() {
        let timing = TimingConfig::default();
        assert_eq!(timing.rf_active_ms + timing.rf_inactive_ms, 30 * 60 * 1000);
        assert_eq!(validate_timing(&timing), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = TimingConfig { rf_active_ms: 0, ..TimingConfig::default() };
        assert_eq!(validate_timing(&zero), Err(ConfigError::ZeroDuration));

        let long = TimingConfig { rf_inactive_ms: u32::MAX, ..TimingConfig::default() };
        assert_eq!(validate_timing(&long), Err(ConfigError::TooLong));

        let pct = TimingConfig { emergency_flush_pct: 101, ..TimingConfig::default() };
        assert_eq!(validate_timing(&pct), Err(ConfigError::ThresholdOutOfRange));
    }

    #[test]
    fn test_apply_bumps_generation() {
        let config = SnifferConfig::new();
        let timing = TimingConfig { commit_interval_ms: 5_000, ..TimingConfig::default() };

        config.apply(&timing).unwrap();
        assert_eq!(config.generation(), 1);
        assert_eq!(config.timing(), timing);

        let bad = TimingConfig { commit_interval_ms: 0, ..timing };
        assert!(config.apply(&bad).is_err());
        assert_eq!(config.generation(), 1);
        assert_eq!(config.timing().commit_interval_ms, 5_000);
    }
}
