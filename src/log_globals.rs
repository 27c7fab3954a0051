//! Global log stream instance.
//!
//! One ring for interrupt context, drained by the polling loop.

use crate::logging::LogStream;

/// ISR log stream.
///
/// Single producer (GPIO ISR service), single consumer (main loop drain).
pub static ISR_LOG: LogStream = LogStream::new();
