//! Hardware Abstraction Layer for ClockSignalSniffer.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

pub mod gpio;
pub mod led;
pub mod sd;

pub use gpio::SignalInputs;
pub use led::LedcRgb;
pub use sd::{mount_sd_card, sd_card_storage, SdVolume};
