//! NVS persistence for the timing parameters with schema versioning.
//!
//! # Version History
//!
//! - **v1** (current): rf_active_ms, rf_inactive_ms, commit_interval_ms,
//!   min_pulse_width_ms, emergency_flush_pct
//!
//! A missing version stamp (0) is a fresh install. Newer stamps are
//! rejected and the defaults kept.

#![cfg_attr(not(target_os = "espidf"), allow(dead_code, unused_imports))]

use core::cmp::Ordering;

use super::{ConfigError, TimingConfig, CONFIG};

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Current NVS schema version for the timing parameters
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// NVS namespace for sniffer configuration
pub const NVS_NAMESPACE: &str = "sniffer_cfg";

const VERSION_KEY: &str = "schema_ver";
const RF_ACTIVE_KEY: &str = "rf_active";
const RF_INACTIVE_KEY: &str = "rf_inactive";
const COMMIT_KEY: &str = "commit_ms";
const MIN_PULSE_KEY: &str = "min_pulse";
const EMERGENCY_KEY: &str = "emerg_pct";

/// Migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationResult {
    /// Fresh install, no migration needed (using defaults)
    FreshInstall,
    /// Schema up-to-date, loaded successfully
    UpToDate,
}

/// NVS operation errors
#[derive(Debug)]
pub enum NvsError {
    /// NVS namespace could not be opened
    #[cfg(target_os = "espidf")]
    InitFailed(EspError),
    /// Schema version too new (downgrade not supported)
    TooNew { stored_version: u32 },
    /// NVS read/write error
    #[cfg(target_os = "espidf")]
    IoError(EspError),
    /// Stored values failed validation
    Invalid(ConfigError),
    /// Feature not available on this platform
    #[cfg(not(target_os = "espidf"))]
    NotAvailable,
}

impl core::fmt::Display for NvsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            #[cfg(target_os = "espidf")]
            Self::InitFailed(e) => write!(f, "NVS init failed: {}", e),
            Self::TooNew { stored_version } => {
                write!(f, "stored schema v{} is newer than v{}", stored_version, CURRENT_SCHEMA_VERSION)
            }
            #[cfg(target_os = "espidf")]
            Self::IoError(e) => write!(f, "NVS I/O error: {}", e),
            Self::Invalid(e) => write!(f, "stored timing rejected: {}", e),
            #[cfg(not(target_os = "espidf"))]
            Self::NotAvailable => f.write_str("NVS not available on this platform"),
        }
    }
}

impl std::error::Error for NvsError {}

#[cfg(target_os = "espidf")]
impl From<EspError> for NvsError {
    fn from(e: EspError) -> Self {
        NvsError::IoError(e)
    }
}

impl From<ConfigError> for NvsError {
    fn from(e: ConfigError) -> Self {
        NvsError::Invalid(e)
    }
}

/// Decide what to do with a stored schema version.
///
/// `Ok(None)` means load as-is, `Ok(Some(FreshInstall))` means the caller
/// keeps the defaults.
fn classify_version(stored_version: u32) -> Result<Option<MigrationResult>, NvsError> {
    match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
        Ordering::Equal => Ok(None),
        Ordering::Less => Ok(Some(MigrationResult::FreshInstall)),
        Ordering::Greater => Err(NvsError::TooNew { stored_version }),
    }
}

/// Load timing from NVS into [`CONFIG`].
///
/// Stored values are validated before they replace the defaults.
#[cfg(target_os = "espidf")]
pub fn load_from_nvs(partition: EspDefaultNvsPartition) -> Result<MigrationResult, NvsError> {
    let storage = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)?;

    let stored_version = storage.get_u32(VERSION_KEY)?.unwrap_or(0);

    match classify_version(stored_version)? {
        None => {
            let timing = load_v1(&storage)?;
            CONFIG.apply(&timing)?;
            Ok(MigrationResult::UpToDate)
        }
        Some(result) => Ok(result),
    }
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn load_from_nvs() -> Result<MigrationResult, NvsError> {
    Err(NvsError::NotAvailable)
}

/// Save the current [`CONFIG`] timing with a version stamp.
#[cfg(target_os = "espidf")]
pub fn save_to_nvs(partition: EspDefaultNvsPartition) -> Result<(), NvsError> {
    let mut storage = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)?;

    storage.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
    save_v1(&mut storage, &CONFIG.timing())?;
    Ok(())
}

/// Stub for non-ESP platforms
#[cfg(not(target_os = "espidf"))]
pub fn save_to_nvs() -> Result<(), NvsError> {
    Err(NvsError::NotAvailable)
}

// ========================================
// v1 Schema Load/Save
// ========================================

#[cfg(target_os = "espidf")]
fn load_v1(storage: &EspNvs<NvsDefault>) -> Result<TimingConfig, NvsError> {
    let mut timing = CONFIG.timing();

    if let Some(v) = storage.get_u32(RF_ACTIVE_KEY)? {
        timing.rf_active_ms = v;
    }
    if let Some(v) = storage.get_u32(RF_INACTIVE_KEY)? {
        timing.rf_inactive_ms = v;
    }
    if let Some(v) = storage.get_u32(COMMIT_KEY)? {
        timing.commit_interval_ms = v;
    }
    if let Some(v) = storage.get_u32(MIN_PULSE_KEY)? {
        timing.min_pulse_width_ms = v;
    }
    if let Some(v) = storage.get_u8(EMERGENCY_KEY)? {
        timing.emergency_flush_pct = v;
    }

    Ok(timing)
}

#[cfg(target_os = "espidf")]
fn save_v1(storage: &mut EspNvs<NvsDefault>, timing: &TimingConfig) -> Result<(), NvsError> {
    storage.set_u32(RF_ACTIVE_KEY, timing.rf_active_ms)?;
    storage.set_u32(RF_INACTIVE_KEY, timing.rf_inactive_ms)?;
    storage.set_u32(COMMIT_KEY, timing.commit_interval_ms)?;
    storage.set_u32(MIN_PULSE_KEY, timing.min_pulse_width_ms)?;
    storage.set_u8(EMERGENCY_KEY, timing.emergency_flush_pct)?;
    Ok(())
}
