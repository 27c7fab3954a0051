//! Board wiring (ESP32 DevKit).

use crate::record::{SignalId, SIGNAL_COUNT};

/// Input pin for each signal, indexed by [`SignalId::index`].
pub const SIGNAL_PINS: [i32; SIGNAL_COUNT] = [
    36, // RF
    39, // MU
    34, // BR
    35, // BA
];

// SD card (SPI3): CS 17, MOSI 23, CLK 18, MISO 19.
// RGB status LED (LEDC): R 32, G 33, B 25.
// Both are taken as typed peripherals in main.

/// Input pin wired to `signal`.
#[inline]
pub const fn signal_pin(signal: SignalId) -> i32 {
    SIGNAL_PINS[signal.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_pins() {
        assert_eq!(signal_pin(SignalId::Rf), 36);
        assert_eq!(signal_pin(SignalId::Ba), 35);
    }
}
