//! ClockSignalSniffer - Main entry point
//!
//! 1. Initialize ESP-IDF and logging
//! 2. Load timing parameters from NVS
//! 3. Set up SD storage (mounted on demand) and the status LED
//! 4. Install the signal interrupts
//! 5. Enter the polling loop

#[cfg(target_os = "espidf")]
fn main() {
    device::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("{}: this binary is ESP32 firmware, build it for an espidf target", env!("VERSION_STRING"));
}

#[cfg(target_os = "espidf")]
mod device {
    use anyhow::Context;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::log::EspLogger;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use clock_signal_sniffer::config::{self, nvs, nvs::MigrationResult, CONFIG, DUTY_CYCLED_SIGNAL};
    use clock_signal_sniffer::hal::{sd_card_storage, LedcRgb, SignalInputs};
    use clock_signal_sniffer::log_globals::ISR_LOG;
    use clock_signal_sniffer::status::{StatusIndicator, SystemStatus};
    use clock_signal_sniffer::{clock, CaptureStats, CsvSink, EdgeDetector, EventQueue, Supervisor};

    static QUEUE: EventQueue = EventQueue::new();
    static STATS: CaptureStats = CaptureStats::new();

    pub fn run() -> ! {
        esp_idf_svc::sys::link_patches();
        EspLogger::initialize_default();
        log::info!("{}", env!("VERSION_STRING"));

        let peripherals = match Peripherals::take() {
            Ok(p) => p,
            Err(e) => {
                log::error!("Peripherals unavailable: {}", e);
                halt()
            }
        };
        let pins = peripherals.pins;

        match EspDefaultNvsPartition::take() {
            Ok(partition) => load_config(partition),
            Err(e) => log::warn!("NVS unavailable, using defaults: {}", e),
        }
        let timing = CONFIG.timing();

        let storage = sd_card_storage(peripherals.spi3, pins.gpio18, pins.gpio23, pins.gpio19, pins.gpio17);

        let led_timer = match LedcTimerDriver::new(peripherals.ledc.timer0, &TimerConfig::default().frequency(5.kHz().into())) {
            Ok(timer) => timer,
            Err(e) => {
                log::error!("LED timer setup failed: {}", e);
                halt()
            }
        };
        let led = match (
            LedcDriver::new(peripherals.ledc.channel0, &led_timer, pins.gpio32),
            LedcDriver::new(peripherals.ledc.channel1, &led_timer, pins.gpio33),
            LedcDriver::new(peripherals.ledc.channel2, &led_timer, pins.gpio25),
        ) {
            (Ok(red), Ok(green), Ok(blue)) => LedcRgb::new(red, green, blue),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                log::error!("LED setup failed: {}", e);
                halt()
            }
        };

        let detector: &'static EdgeDetector<'static> =
            Box::leak(Box::new(EdgeDetector::new(&QUEUE, &STATS, timing.min_pulse_width_ms)));

        let inputs = match start_capture(detector) {
            Ok(inputs) => inputs,
            Err(e) => {
                log::error!("Signal capture failed to start: {:#}", e);
                let mut status = StatusIndicator::new(led, clock::millis());
                status.set_status(SystemStatus::Panic, clock::millis());
                loop {
                    status.update(clock::millis());
                    FreeRtos::delay_ms(config::POLL_PERIOD_MS);
                }
            }
        };

        let sink = CsvSink::new(storage, config::DATA_FILE_PATH);
        let mut supervisor = Supervisor::new(detector, &STATS, &ISR_LOG, sink, led, timing, clock::millis());
        log::info!(
            "Capturing; {} armed {} s every {} s",
            DUTY_CYCLED_SIGNAL,
            timing.rf_active_ms / 1000,
            (timing.rf_active_ms + timing.rf_inactive_ms) / 1000
        );

        loop {
            let outcome = supervisor.poll(clock::millis());
            if let Some(armed) = outcome.arming_changed {
                if let Err(e) = inputs.set_interrupt(DUTY_CYCLED_SIGNAL, armed) {
                    log::error!("Failed to toggle {} interrupt: {}", DUTY_CYCLED_SIGNAL, e);
                }
            }
            FreeRtos::delay_ms(config::POLL_PERIOD_MS);
        }
    }

    fn load_config(partition: EspDefaultNvsPartition) {
        match nvs::load_from_nvs(partition.clone()) {
            Ok(MigrationResult::FreshInstall) => {
                log::info!("No stored configuration, saving defaults");
                if let Err(e) = nvs::save_to_nvs(partition) {
                    log::warn!("Failed to save defaults: {}", e);
                }
            }
            Ok(result) => log::info!("Configuration loaded ({:?})", result),
            Err(e) => log::warn!("Stored configuration ignored: {}", e),
        }
    }

    fn start_capture(detector: &'static EdgeDetector<'static>) -> anyhow::Result<SignalInputs> {
        let inputs = SignalInputs::install().context("installing GPIO interrupts")?;
        detector.begin(inputs.read_levels());
        detector.register().context("registering edge detector")?;
        inputs.sync_arming(detector).context("enabling GPIO interrupts")?;
        Ok(inputs)
    }

    fn halt() -> ! {
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
}
