//! M5Stack Core (ESP32) pin assignment and bus setup.
//!
//! | Function      | Pins                                  |
//! |---------------|---------------------------------------|
//! | SPI (shared)  | SCK 18, MOSI 23, MISO 19              |
//! | LCD           | CS 14, DC 27, RST 33, backlight 32    |
//! | SD card       | CS 4                                  |
//! | I2C (Grove)   | SDA 21, SCL 22                        |
//! | Button A      | GPIO39, active low, external pull-up  |

use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::peripherals::{GPIO21, GPIO22, I2C0};
use esp_hal::time::Rate;
use esp_hal::Async;

pub const DISPLAY_WIDTH: u16 = 320;
pub const DISPLAY_HEIGHT: u16 = 240;

/// SPI clock while the SD card is in SPI mode; the card needs 400 kHz or
/// less until it is initialised
pub const SPI_INIT_RATE_KHZ: u32 = 400;

/// SPI clock shared by the LCD and the card after initialisation
pub const SPI_RATE_MHZ: u32 = 20;

/// The SEN0467 is specified for standard-mode I2C only
pub const I2C_RATE_KHZ: u32 = 100;

/// Create the async I2C bus on the Grove port.
pub fn create_i2c_bus(
    i2c0: I2C0<'static>,
    sda: GPIO21<'static>,
    scl: GPIO22<'static>,
) -> Result<I2c<'static, Async>, esp_hal::i2c::master::ConfigError> {
    Ok(I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_RATE_KHZ)),
    )?
    .with_sda(sda)
    .with_scl(scl)
    .into_async())
}
