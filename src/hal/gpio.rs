//! GPIO HAL for the four signal inputs.
//!
//! Uses the ESP-IDF GPIO ISR service directly. All pin handlers are
//! dispatched from the one service interrupt, which makes every handler
//! part of a single producer context for the event queue.

use core::ffi::c_void;

use esp_idf_svc::sys::{self, esp, EspError};

use crate::clock;
use crate::config::pins::{signal_pin, SIGNAL_PINS};
use crate::detector::{self, EdgeDetector};
use crate::record::{Level, SignalId, SIGNAL_COUNT};

/// Per-pin interrupt handler. `arg` carries the signal index.
unsafe extern "C" fn edge_isr(arg: *mut c_void) {
    let Some(signal) = SignalId::from_index(arg as usize) else {
        return;
    };
    let level = Level::from_raw(sys::gpio_get_level(signal_pin(signal)));
    let _ = detector::dispatch_edge(signal, level, clock::millis());
}

/// Configured signal inputs with their handlers installed.
///
/// Interrupts start disabled; enable them with [`SignalInputs::sync_arming`]
/// after the detector is registered.
pub struct SignalInputs {
    _private: (),
}

impl SignalInputs {
    /// Configure the pins as any-edge inputs and attach the handlers.
    pub fn install() -> Result<Self, EspError> {
        let pin_bit_mask = SIGNAL_PINS.iter().fold(0u64, |mask, &pin| mask | (1u64 << pin));

        // GPIO34-39 have no internal pulls; the board carries external pull-ups.
        let conf = sys::gpio_config_t {
            pin_bit_mask,
            mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: sys::gpio_int_type_t_GPIO_INTR_ANYEDGE,
            ..Default::default()
        };

        unsafe {
            esp!(sys::gpio_config(&conf))?;
            esp!(sys::gpio_install_isr_service(0))?;

            for signal in SignalId::ALL {
                let pin = signal_pin(signal);
                esp!(sys::gpio_intr_disable(pin))?;
                esp!(sys::gpio_isr_handler_add(pin, Some(edge_isr), signal.index() as *mut c_void))?;
            }
        }

        log::info!("Signal inputs on GPIO {:?}", SIGNAL_PINS);
        Ok(Self { _private: () })
    }

    /// Current level of every input.
    pub fn read_levels(&self) -> [Level; SIGNAL_COUNT] {
        SignalId::ALL.map(|signal| Level::from_raw(unsafe { sys::gpio_get_level(signal_pin(signal)) }))
    }

    /// Enable or disable the interrupt of one input.
    pub fn set_interrupt(&self, signal: SignalId, enabled: bool) -> Result<(), EspError> {
        let pin = signal_pin(signal);
        if enabled {
            esp!(unsafe { sys::gpio_intr_enable(pin) })
        } else {
            esp!(unsafe { sys::gpio_intr_disable(pin) })
        }
    }

    /// Make every pin interrupt match the detector's arming state.
    pub fn sync_arming<const N: usize>(&self, detector: &EdgeDetector<'_, N>) -> Result<(), EspError> {
        for signal in SignalId::ALL {
            self.set_interrupt(signal, detector.is_armed(signal))?;
        }
        Ok(())
    }
}
