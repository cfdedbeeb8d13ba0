#![cfg_attr(not(test), no_std)]

mod fmt;

mod bme280;
mod calibration;
mod config;

pub use bme280::{BME280Sensor, DEFAULT_ADDRESS, SECONDARY_ADDRESS};
pub use calibration::{humidity_nibbles, CalibrationSet, RawSample};
pub use config::{Config, Filter, Mode, Oversampling};

use embedded_hal_async::i2c::ErrorKind;

/// One compensated measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BME280Response {
    /// Degrees Celsius
    pub temperature: f32,
    /// Relative humidity in percent
    pub humidity: f32,
    /// Hectopascal
    pub pressure: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BME280Error {
    /// A bus transaction was not acknowledged or failed
    I2CError(ErrorKind),
}
