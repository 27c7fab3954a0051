//! # ClockSignalSniffer
//!
//! Edge logger for the four lines of an electromechanical clock system.
//!
//! ## Architecture
//!
//! ```text
//! GPIO edge ─► EdgeDetector (ISR) ─► EventQueue ─► Supervisor::poll ─► CsvSink (SD)
//!                    ▲                                   │
//!                    └──────── arming (RF) ◄─ DutyCycleScheduler
//! ```
//!
//! - The interrupt side never blocks, allocates or logs through `log`
//! - The queue is the only shared buffer; it drops new edges when full
//! - Everything else runs in one cooperative polling loop
//!
//! Hardware code lives in [`hal`] and is only built for ESP-IDF, so the
//! core runs and tests on the host.

pub mod clock;
pub mod config;
pub mod detector;
pub mod duty_cycle;
pub mod health;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod queue;
pub mod record;
pub mod sink;
pub mod status;
pub mod supervisor;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use config::CONFIG;
pub use detector::{dispatch_edge, EdgeDetector, EdgeOutcome};
pub use duty_cycle::{DutyCycleScheduler, DutyPhase};
pub use health::{CaptureStats, HealthReport};
pub use queue::EventQueue;
pub use record::{Edge, EventRecord, Level, SignalId};
pub use sink::{CsvSink, FsStorage, MountedStorage, PersistReport, SinkError};
pub use status::{StatusIndicator, SystemStatus};
pub use supervisor::Supervisor;
