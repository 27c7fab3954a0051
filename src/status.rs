//! RGB status indicator.
//!
//! | Status              | Colour              |
//! |---------------------|---------------------|
//! | Ok                  | green               |
//! | StorageUnavailable  | purple (red + blue) |
//! | BufferOverflow      | red                 |
//! | Panic               | red, blinking 500ms |
//!
//! Consumes a status, gives nothing back to the capture path.

use crate::clock;

/// Blink half-period for [`SystemStatus::Panic`].
pub const BLINK_PERIOD_MS: u32 = 500;

/// Coarse node health shown on the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// Everything normal
    Ok,
    /// SD card missing, data pending in RAM
    StorageUnavailable,
    /// Queue filled up, edges are being lost
    BufferOverflow,
    /// Fatal start-up error
    Panic,
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Self = Self::new(0, 0, 0);
    pub const RED: Self = Self::new(255, 0, 0);
    pub const GREEN: Self = Self::new(0, 255, 0);
    pub const PURPLE: Self = Self::new(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl SystemStatus {
    /// Steady colour for this status (first blink phase for Panic).
    pub const fn color(self) -> Rgb {
        match self {
            SystemStatus::Ok => Rgb::GREEN,
            SystemStatus::StorageUnavailable => Rgb::PURPLE,
            SystemStatus::BufferOverflow | SystemStatus::Panic => Rgb::RED,
        }
    }
}

/// Something that can show a colour.
///
/// Implementations swallow their own hardware errors.
pub trait RgbLed {
    fn set_color(&mut self, color: Rgb);
}

/// Drives an [`RgbLed`] from a [`SystemStatus`].
pub struct StatusIndicator<L: RgbLed> {
    led: L,
    status: SystemStatus,
    last_blink_ms: u32,
    blink_on: bool,
}

impl<L: RgbLed> StatusIndicator<L> {
    /// Start showing [`SystemStatus::Ok`].
    pub fn new(mut led: L, now_ms: u32) -> Self {
        led.set_color(SystemStatus::Ok.color());
        Self {
            led,
            status: SystemStatus::Ok,
            last_blink_ms: now_ms,
            blink_on: true,
        }
    }

    /// Get the current status
    #[inline]
    pub fn status(&self) -> SystemStatus {
        self.status
    }

    /// Show a new status. Re-setting the current one is a no-op.
    pub fn set_status(&mut self, status: SystemStatus, now_ms: u32) {
        if status == self.status {
            return;
        }
        self.status = status;
        self.last_blink_ms = now_ms;
        self.blink_on = true;
        self.led.set_color(status.color());
    }

    /// Advance the blink animation. Call every loop iteration.
    pub fn update(&mut self, now_ms: u32) {
        if self.status != SystemStatus::Panic {
            return;
        }
        if clock::elapsed(now_ms, self.last_blink_ms) >= BLINK_PERIOD_MS {
            self.last_blink_ms = now_ms;
            self.blink_on = !self.blink_on;
            self.led.set_color(if self.blink_on { Rgb::RED } else { Rgb::OFF });
        }
    }

    /// Access the LED driver.
    pub fn led(&self) -> &L {
        &self.led
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingLed(Vec<Rgb>);

    impl RgbLed for RecordingLed {
        fn set_color(&mut self, color: Rgb) {
            self.0.push(color);
        }
    }

    #[test]
    fn test_initial_green() {
        let indicator = StatusIndicator::new(RecordingLed::default(), 0);
        assert_eq!(indicator.status(), SystemStatus::Ok);
        assert_eq!(indicator.led().0, vec![Rgb::GREEN]);
    }

    #[test]
    fn test_status_colors() {
        let mut indicator = StatusIndicator::new(RecordingLed::default(), 0);
        indicator.set_status(SystemStatus::StorageUnavailable, 1);
        indicator.set_status(SystemStatus::StorageUnavailable, 2);
        indicator.set_status(SystemStatus::BufferOverflow, 3);

        assert_eq!(indicator.led().0, vec![Rgb::GREEN, Rgb::PURPLE, Rgb::RED]);
    }

    #[test]
    fn test_panic_blinks() {
        let mut indicator = StatusIndicator::new(RecordingLed::default(), 0);
        indicator.set_status(SystemStatus::Panic, 1000);

        indicator.update(1499);
        indicator.update(1500);
        indicator.update(2000);

        assert_eq!(indicator.led().0, vec![Rgb::GREEN, Rgb::RED, Rgb::OFF, Rgb::RED]);
    }

    #[test]
    fn test_steady_status_does_not_blink() {
        let mut indicator = StatusIndicator::new(RecordingLed::default(), 0);
        indicator.update(10_000);
        assert_eq!(indicator.led().0.len(), 1);
    }
}
