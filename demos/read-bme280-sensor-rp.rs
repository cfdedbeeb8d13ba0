#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_bme280_sensor::{BME280Error, BME280Sensor, Config, DEFAULT_ADDRESS};
use embassy_executor::Spawner;
use embassy_rp::peripherals::I2C0;
use embassy_rp::{bind_interrupts, i2c};
use embassy_time::{Delay, Duration, Timer};
use panic_probe as _;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    let p = embassy_rp::init(Default::default());

    let sda = p.PIN_0;
    let scl = p.PIN_1;

    // Configure I2C
    let mut i2c = i2c::I2c::new_async(p.I2C0, scl, sda, Irqs, Default::default());

    // Configure the sensor and read its calibration
    let mut sensor = match BME280Sensor::init(&mut i2c, DEFAULT_ADDRESS, Delay, Config::default()).await {
        Ok(sensor) => sensor,
        Err(BME280Error::I2CError(kind)) => {
            error!("BME280 not responding: {:?}", kind);
            loop {
                Timer::after(Duration::from_secs(60)).await;
            }
        }
    };

    loop {
        match sensor.read().await {
            Ok(data) => {
                info!(
                    "Temperature: {}°C, Humidity: {}%, Pressure: {}hPa",
                    data.temperature, data.humidity, data.pressure
                );
            }
            Err(BME280Error::I2CError(kind)) => error!("I2C communication error: {:?}", kind),
        }

        Timer::after(Duration::from_secs(1)).await;
    }
}
