//! Peripheral bring-up for the klima board.
//!
//! The board wires both climate sensors to the primary I2C pins (SDA 21,
//! SCL 22) and the SD card module to VSPI (SCK 18, MISO 19, MOSI 23, CS 5).

use esp_hal::{i2c::master::Config as I2cConfig, time::Rate};

/// Initialize the shared sensor I2C bus (400 kHz).
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO21<'static>,
    scl: esp_hal::peripherals::GPIO22<'static>,
) -> esp_hal::i2c::master::I2c<'static, esp_hal::Async> {
    esp_hal::i2c::master::I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sda(sda)
    .with_scl(scl)
    .into_async()
}

/// Wrap an SPI device and a delay into the SD card driver.
pub fn init_sd_card<S, D>(sd_card_spi: S, delay: D) -> embedded_sdmmc::SdCard<S, D>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
{
    embedded_sdmmc::SdCard::new(sd_card_spi, delay)
}
