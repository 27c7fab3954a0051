//! SD card over SPI, mounted as a FAT volume.
//!
//! Once mounted, the card is plain `std::fs` under
//! [`SD_MOUNT_POINT`](crate::config::SD_MOUNT_POINT). [`sd_card_storage`]
//! keeps the bus pins and remounts whenever a card shows up again.

use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::sd::spi::SdSpiHostDriver;
use esp_idf_svc::hal::sd::{SdCardConfiguration, SdCardDriver};
use esp_idf_svc::hal::spi::config::DriverConfig;
use esp_idf_svc::hal::spi::{Dma, SpiAnyPins, SpiDriver};
use esp_idf_svc::io::vfs::MountedFatfs;
use esp_idf_svc::sys::EspError;

use crate::config::{SD_MOUNT_POINT, SD_MOUNT_RETRY_MS};
use crate::sink::MountedStorage;

/// Maximum files open at once on the volume.
const MAX_OPEN_FILES: usize = 4;

/// Mounted card. Unmounts on drop.
pub type SdVolume<'d> = MountedFatfs<Fatfs<SdCardDriver<SdSpiHostDriver<'d, SpiDriver<'d>>>>>;

/// Bring up the SPI bus, detect the card and mount it.
pub fn mount_sd_card<'d>(
    spi: impl Peripheral<P = impl SpiAnyPins> + 'd,
    sclk: impl Peripheral<P = impl OutputPin> + 'd,
    mosi: impl Peripheral<P = impl OutputPin> + 'd,
    miso: impl Peripheral<P = impl InputPin> + 'd,
    cs: impl Peripheral<P = impl OutputPin> + 'd,
) -> Result<SdVolume<'d>, EspError> {
    let spi_driver = SpiDriver::new(spi, sclk, mosi, Some(miso), &DriverConfig::default().dma(Dma::Auto(4096)))?;

    let host = SdSpiHostDriver::new(
        spi_driver,
        Some(cs),
        AnyIOPin::none(),
        AnyIOPin::none(),
        AnyIOPin::none(),
        None,
    )?;
    let card = SdCardDriver::new_spi(host, &SdCardConfiguration::new())?;

    let volume = MountedFatfs::mount(Fatfs::new_sdcard(0, card)?, SD_MOUNT_POINT, MAX_OPEN_FILES)?;
    log::info!("SD card mounted at {}", SD_MOUNT_POINT);
    Ok(volume)
}

/// Sink storage on the SD card, mounted on demand.
///
/// Owns the bus pins for the whole run. Each attempt builds a fresh driver
/// stack from them; a failed attempt tears its partial stack down before
/// returning.
pub fn sd_card_storage<SPI, SCLK, MOSI, MISO, CS>(
    mut spi: SPI,
    mut sclk: SCLK,
    mut mosi: MOSI,
    mut miso: MISO,
    mut cs: CS,
) -> MountedStorage<SdVolume<'static>, impl FnMut() -> Result<SdVolume<'static>, EspError>>
where
    SPI: Peripheral<P = SPI> + SpiAnyPins + 'static,
    SCLK: Peripheral<P = SCLK> + OutputPin + 'static,
    MOSI: Peripheral<P = MOSI> + OutputPin + 'static,
    MISO: Peripheral<P = MISO> + InputPin + 'static,
    CS: Peripheral<P = CS> + OutputPin + 'static,
{
    let mount = move || {
        // SAFETY: `MountedStorage` only calls this while no volume exists,
        // so no other driver holds these peripherals.
        unsafe {
            mount_sd_card(
                spi.clone_unchecked(),
                sclk.clone_unchecked(),
                mosi.clone_unchecked(),
                miso.clone_unchecked(),
                cs.clone_unchecked(),
            )
        }
    };
    MountedStorage::new(SD_MOUNT_POINT, SD_MOUNT_RETRY_MS, mount)
}
