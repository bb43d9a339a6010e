//! Sensor trait definitions and drivers.

mod multigas;

pub use multigas::{AcquireMode, DEFAULT_I2C_ADDRESS, GasReadings, MultiGasSensor};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: not responding ({details})")]
    NotConnected {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: bad checksum in response to {operation}")]
    Checksum {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// Trait for sensor reading data structures.
/// Provides compile-time guarantees about the number of values and their conversion to arrays.
pub trait SensorReadings<const COUNT: usize> {
    /// Convert the readings into a fixed-size array.
    fn to_array(self) -> [f32; COUNT];
}

/// Trait for sensors that produce typed readings.
pub trait Sensor<const COUNT: usize> {
    /// The type of readings this sensor produces.
    type Readings: SensorReadings<COUNT>;

    /// Probe the device and put it into the acquisition mode the logger needs.
    ///
    /// Called repeatedly at startup until it succeeds.
    fn connect(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}

/// Plain value arrays are already in channel order.
impl<const COUNT: usize> SensorReadings<COUNT> for [f32; COUNT] {
    fn to_array(self) -> [f32; COUNT] {
        self
    }
}
