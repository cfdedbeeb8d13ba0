use embassy_time::Duration;

/// Power mode field of `ctrl_meas`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Sleep = 0b00,
    /// One conversion, then back to sleep
    Forced = 0b01,
    Normal = 0b11,
}

/// Oversampling setting for a single measurement channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    /// Channel disabled, output is 0x80000 (0x8000 for humidity)
    Skipped = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// Number of samples taken per conversion
    pub const fn samples(self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// IIR filter coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Filter {
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

/// Sensor acquisition settings written during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub humidity_oversampling: Oversampling,
    pub filter: Filter,
}

impl Default for Config {
    fn default() -> Self {
        Self::weather_monitoring()
    }
}

impl Config {
    /// Single sample per channel, filter off
    ///
    /// Datasheet profile for weather monitoring. Results in the register
    /// values 0xF5=0x00, 0xF4=0x24 and 0xF2=0x01.
    pub const fn weather_monitoring() -> Self {
        Self {
            temperature_oversampling: Oversampling::X1,
            pressure_oversampling: Oversampling::X1,
            humidity_oversampling: Oversampling::X1,
            filter: Filter::Off,
        }
    }

    /// Value for the `config` register (0xF5); standby time and 3-wire SPI are left at 0
    pub const fn config_register(&self) -> u8 {
        (self.filter as u8) << 2
    }

    /// Value for the `ctrl_meas` register (0xF4) in the given power mode
    pub const fn ctrl_meas(&self, mode: Mode) -> u8 {
        ((self.temperature_oversampling as u8) << 5)
            | ((self.pressure_oversampling as u8) << 2)
            | mode as u8
    }

    /// Value for the `ctrl_hum` register (0xF2)
    pub const fn ctrl_hum(&self) -> u8 {
        self.humidity_oversampling as u8
    }

    /// Maximum duration of one forced conversion with these settings
    pub fn measurement_time(&self) -> Duration {
        let mut micros: u64 = 1250;
        let t = self.temperature_oversampling.samples() as u64;
        let p = self.pressure_oversampling.samples() as u64;
        let h = self.humidity_oversampling.samples() as u64;
        micros += 2300 * t;
        if p > 0 {
            micros += 2300 * p + 575;
        }
        if h > 0 {
            micros += 2300 * h + 575;
        }
        Duration::from_micros(micros)
    }
}
