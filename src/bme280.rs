use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error as _, I2c};

use crate::calibration::{humidity_nibbles, CalibrationSet, RawSample};
use crate::config::{Config, Mode};
use crate::{BME280Error, BME280Response};

/// I2C address with SDO tied to GND
pub const DEFAULT_ADDRESS: u8 = 0x76;
/// I2C address with SDO tied to VDDIO
pub const SECONDARY_ADDRESS: u8 = 0x77;

const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

const REG_DIG_T1: u8 = 0x88;
const REG_DIG_T2: u8 = 0x8A;
const REG_DIG_T3: u8 = 0x8C;
const REG_DIG_P1: u8 = 0x8E;
const REG_DIG_P2: u8 = 0x90;
const REG_DIG_P3: u8 = 0x92;
const REG_DIG_P4: u8 = 0x94;
const REG_DIG_P5: u8 = 0x96;
const REG_DIG_P6: u8 = 0x98;
const REG_DIG_P7: u8 = 0x9A;
const REG_DIG_P8: u8 = 0x9C;
const REG_DIG_P9: u8 = 0x9E;
const REG_DIG_H1: u8 = 0xA1;
const REG_DIG_H2: u8 = 0xE1;
const REG_DIG_H3: u8 = 0xE3;
const REG_DIG_H4_MSB: u8 = 0xE4;
const REG_DIG_H4_H5_LSB: u8 = 0xE5;
const REG_DIG_H5_MSB: u8 = 0xE6;
const REG_DIG_H6: u8 = 0xE7;

/// BME280 on an I2C bus
///
/// A sensor handle only exists after [`init`](Self::init) has configured the
/// device and read its trimming parameters, so every [`read`](Self::read)
/// runs against a complete calibration set. The bus is borrowed for the
/// lifetime of the handle; drivers sharing a bus must be used one at a time.
pub struct BME280Sensor<'a, T: I2c, D: DelayNs> {
    registers: Registers<'a, T>,
    delay: D,
    config: Config,
    calibration: CalibrationSet,
}

impl<'a, T: I2c, D: DelayNs> BME280Sensor<'a, T, D> {
    /// Configures the sensor in sleep mode and reads its calibration
    pub async fn init(i2c: &'a mut T, address: u8, delay: D, config: Config) -> Result<Self, BME280Error> {
        let mut registers = Registers { i2c, address };

        info!("Configuring BME280 at address {}", address);
        registers.write(REG_CONFIG, config.config_register()).await?;
        registers.write(REG_CTRL_MEAS, config.ctrl_meas(Mode::Sleep)).await?;
        registers.write(REG_CTRL_HUM, config.ctrl_hum()).await?;

        let calibration = registers.read_calibration().await?;
        debug!("Calibration: {:?}", calibration);
        Ok(Self {
            registers,
            delay,
            config,
            calibration,
        })
    }

    /// Triggers a forced conversion and returns the compensated values
    pub async fn read(&mut self) -> Result<BME280Response, BME280Error> {
        let raw = self.read_raw().await?;
        let response = self.calibration.compensate(&raw);
        debug!(
            "Temperature: {}°C, Humidity: {}%, Pressure: {}hPa",
            response.temperature, response.humidity, response.pressure
        );
        Ok(response)
    }

    /// Triggers a forced conversion and returns the uncompensated ADC codes
    pub async fn read_raw(&mut self) -> Result<RawSample, BME280Error> {
        self.registers
            .write(REG_CTRL_MEAS, self.config.ctrl_meas(Mode::Forced))
            .await?;
        let wait = self.config.measurement_time();
        self.delay.delay_us(wait.as_micros() as u32).await;

        let mut buf = [0u8; 8];
        self.registers.read(REG_DATA, &mut buf).await?;
        let raw = RawSample::from_bytes(&buf);
        trace!(
            "Raw sample: pressure {}, temperature {}, humidity {}",
            raw.pressure, raw.temperature, raw.humidity
        );
        Ok(raw)
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn address(&self) -> u8 {
        self.registers.address
    }
}

/// Register access to one device on the bus
struct Registers<'a, T: I2c> {
    i2c: &'a mut T,
    address: u8,
}

impl<T: I2c> Registers<'_, T> {
    async fn read_calibration(&mut self) -> Result<CalibrationSet, BME280Error> {
        let t1 = self.read_u16(REG_DIG_T1).await?;
        let t2 = self.read_u16(REG_DIG_T2).await? as i16;
        let t3 = self.read_u16(REG_DIG_T3).await? as i16;
        let p1 = self.read_u16(REG_DIG_P1).await?;
        let p2 = self.read_u16(REG_DIG_P2).await? as i16;
        let p3 = self.read_u16(REG_DIG_P3).await? as i16;
        let p4 = self.read_u16(REG_DIG_P4).await? as i16;
        let p5 = self.read_u16(REG_DIG_P5).await? as i16;
        let p6 = self.read_u16(REG_DIG_P6).await? as i16;
        let p7 = self.read_u16(REG_DIG_P7).await? as i16;
        let p8 = self.read_u16(REG_DIG_P8).await? as i16;
        let p9 = self.read_u16(REG_DIG_P9).await? as i16;
        let h1 = self.read_u8(REG_DIG_H1).await?;
        let h2 = self.read_u16(REG_DIG_H2).await? as i16;
        let h3 = self.read_u8(REG_DIG_H3).await?;
        let e4 = self.read_u8(REG_DIG_H4_MSB).await?;
        let e5 = self.read_u8(REG_DIG_H4_H5_LSB).await?;
        let e6 = self.read_u8(REG_DIG_H5_MSB).await?;
        let (h4, h5) = humidity_nibbles(e4, e5, e6);
        let h6 = self.read_u8(REG_DIG_H6).await? as i8;

        Ok(CalibrationSet {
            t1,
            t2,
            t3,
            p1,
            p2,
            p3,
            p4,
            p5,
            p6,
            p7,
            p8,
            p9,
            h1,
            h2,
            h3,
            h4,
            h5,
            h6,
        })
    }

    async fn read_u8(&mut self, register: u8) -> Result<u8, BME280Error> {
        let mut buf = [0u8; 1];
        self.read(register, &mut buf).await?;
        Ok(buf[0])
    }

    /// Little-endian register pair starting at `register`
    async fn read_u16(&mut self, register: u8) -> Result<u16, BME280Error> {
        let mut buf = [0u8; 2];
        self.read(register, &mut buf).await?;
        Ok(u16::from_le_bytes(buf))
    }

    async fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BME280Error> {
        match self.i2c.write_read(self.address, &[register], buf).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let kind = e.kind();
                warn!("I2C read of register {} from {} failed: {:?}", register, self.address, kind);
                Err(BME280Error::I2CError(kind))
            }
        }
    }

    async fn write(&mut self, register: u8, value: u8) -> Result<(), BME280Error> {
        match self.i2c.write(self.address, &[register, value]).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let kind = e.kind();
                warn!("I2C write of register {} to {} failed: {:?}", register, self.address, kind);
                Err(BME280Error::I2CError(kind))
            }
        }
    }
}
