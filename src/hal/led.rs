//! RGB status LED on three LEDC PWM channels.

use esp_idf_svc::hal::ledc::LedcDriver;

use crate::status::{Rgb, RgbLed};

/// Common-cathode RGB LED, one LEDC channel per colour.
pub struct LedcRgb<'d> {
    red: LedcDriver<'d>,
    green: LedcDriver<'d>,
    blue: LedcDriver<'d>,
}

impl<'d> LedcRgb<'d> {
    pub fn new(red: LedcDriver<'d>, green: LedcDriver<'d>, blue: LedcDriver<'d>) -> Self {
        Self { red, green, blue }
    }
}

/// Scale an 8-bit component to the channel's duty range.
fn duty_for(channel: &LedcDriver<'_>, component: u8) -> u32 {
    channel.get_max_duty() * u32::from(component) / 255
}

impl RgbLed for LedcRgb<'_> {
    fn set_color(&mut self, color: Rgb) {
        for (channel, component) in [
            (&mut self.red, color.r),
            (&mut self.green, color.g),
            (&mut self.blue, color.b),
        ] {
            let duty = duty_for(channel, component);
            if let Err(e) = channel.set_duty(duty) {
                log::warn!("LED duty update failed: {}", e);
            }
        }
    }
}
