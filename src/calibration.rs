//! Factory trimming parameters and the fixed-point compensation formulas
//!
//! All intermediate arithmetic is 32-bit. Overflow wraps like the sensor's
//! reference implementation, and every `>>` truncates at the point shown, so
//! the order of operations must not be changed.

use crate::BME280Response;

/// Upper clamp of the humidity accumulator before the final shift (100 %RH in Q22)
const HUMIDITY_MAX_Q22: i32 = 419_430_400;

/// Trimming parameters read from the sensor's NVM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSet {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

/// Uncompensated ADC codes of one forced conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// 20-bit pressure code
    pub pressure: u32,
    /// 20-bit temperature code
    pub temperature: u32,
    /// 16-bit humidity code
    pub humidity: u32,
}

impl RawSample {
    /// Splits the burst read starting at `press_msb` (0xF7)
    pub fn from_bytes(data: &[u8; 8]) -> Self {
        Self {
            pressure: ((data[0] as u32) << 12) | ((data[1] as u32) << 4) | ((data[2] as u32) >> 4),
            temperature: ((data[3] as u32) << 12) | ((data[4] as u32) << 4) | ((data[5] as u32) >> 4),
            humidity: ((data[6] as u32) << 8) | (data[7] as u32),
        }
    }
}

/// Assembles `dig_H4` and `dig_H5`, which share register 0xE5
///
/// H4 takes 0xE4 as its high byte and the low nibble of 0xE5, H5 takes 0xE6
/// as its high byte and the high nibble of 0xE5.
pub fn humidity_nibbles(e4: u8, e5: u8, e6: u8) -> (i16, i16) {
    let h4 = ((e4 as i16) << 4) | (e5 & 0x0F) as i16;
    let h5 = ((e6 as i16) << 4) | (e5 >> 4) as i16;
    (h4, h5)
}

impl CalibrationSet {
    /// Returns the temperature in hundredths of a degree and the fine temperature
    ///
    /// The fine temperature feeds [`compensate_humidity`](Self::compensate_humidity)
    /// and [`compensate_pressure`](Self::compensate_pressure).
    pub fn compensate_temperature(&self, adc_t: i32) -> (i32, i32) {
        let t1 = self.t1 as i32;
        let t2 = self.t2 as i32;
        let t3 = self.t3 as i32;

        let var1 = ((adc_t >> 3) - (t1 << 1)).wrapping_mul(t2) >> 11;
        let delta = (adc_t >> 4) - t1;
        let var2 = (delta.wrapping_mul(delta) >> 12).wrapping_mul(t3) >> 14;
        let t_fine = var1.wrapping_add(var2);
        let t = t_fine.wrapping_mul(5).wrapping_add(128) >> 8;
        (t, t_fine)
    }

    /// Returns the relative humidity in Q22.10 format (1024 = 1 %RH)
    pub fn compensate_humidity(&self, adc_h: i32, t_fine: i32) -> u32 {
        let h1 = self.h1 as i32;
        let h2 = self.h2 as i32;
        let h3 = self.h3 as i32;
        let h4 = self.h4 as i32;
        let h5 = self.h5 as i32;
        let h6 = self.h6 as i32;

        let v = t_fine.wrapping_sub(76800);

        let offset = (adc_h << 14)
            .wrapping_sub(h4 << 20)
            .wrapping_sub(h5.wrapping_mul(v))
            .wrapping_add(16384)
            >> 15;
        let h6_term = v.wrapping_mul(h6) >> 10;
        let h3_term = (v.wrapping_mul(h3) >> 11).wrapping_add(32768);
        let scale = ((h6_term.wrapping_mul(h3_term) >> 10).wrapping_add(2_097_152))
            .wrapping_mul(h2)
            .wrapping_add(8192)
            >> 14;
        let mut v = offset.wrapping_mul(scale);

        let square = (v >> 15).wrapping_mul(v >> 15) >> 7;
        v = v.wrapping_sub(square.wrapping_mul(h1) >> 4);

        let v = v.clamp(0, HUMIDITY_MAX_Q22);
        (v >> 12) as u32
    }

    /// Returns the pressure in Pa, or 0 when the calibration makes the divisor vanish
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> u32 {
        let p1 = self.p1 as i32;
        let p2 = self.p2 as i32;
        let p3 = self.p3 as i32;
        let p4 = self.p4 as i32;
        let p5 = self.p5 as i32;
        let p6 = self.p6 as i32;
        let p7 = self.p7 as i32;
        let p8 = self.p8 as i32;
        let p9 = self.p9 as i32;

        let mut var1 = (t_fine >> 1) - 64000;
        let mut var2 = ((var1 >> 2).wrapping_mul(var1 >> 2) >> 11).wrapping_mul(p6);
        var2 = var2.wrapping_add(var1.wrapping_mul(p5) << 1);
        var2 = (var2 >> 2).wrapping_add(p4 << 16);
        var1 = ((p3.wrapping_mul((var1 >> 2).wrapping_mul(var1 >> 2) >> 13) >> 3)
            .wrapping_add(p2.wrapping_mul(var1) >> 1))
            >> 18;
        var1 = (32768 + var1).wrapping_mul(p1) >> 15;
        if var1 == 0 {
            return 0;
        }

        let mut p = (1_048_576i32.wrapping_sub(adc_p) as u32)
            .wrapping_sub((var2 >> 12) as u32)
            .wrapping_mul(3125);
        if p < 0x8000_0000 {
            p = (p << 1) / (var1 as u32);
        } else {
            p = (p / var1 as u32).wrapping_mul(2);
        }

        let var1 = p9.wrapping_mul(((p >> 3).wrapping_mul(p >> 3) >> 13) as i32) >> 12;
        let var2 = ((p >> 2) as i32).wrapping_mul(p8) >> 13;
        (p as i32).wrapping_add(var1.wrapping_add(var2).wrapping_add(p7) >> 4) as u32
    }

    /// Runs temperature, humidity and pressure compensation in that order
    pub fn compensate(&self, raw: &RawSample) -> BME280Response {
        let (temperature, t_fine) = self.compensate_temperature(raw.temperature as i32);
        let humidity = self.compensate_humidity(raw.humidity as i32, t_fine);
        let pressure = self.compensate_pressure(raw.pressure as i32, t_fine);
        BME280Response {
            temperature: temperature as f32 / 100.0,
            humidity: humidity as f32 / 1024.0,
            pressure: pressure as f32 / 100.0,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Trimming values from the datasheet example, with typical humidity coefficients
    pub(crate) const REFERENCE: CalibrationSet = CalibrationSet {
        t1: 27504,
        t2: 26435,
        t3: -1000,
        p1: 36477,
        p2: -10685,
        p3: 3024,
        p4: 2855,
        p5: 140,
        p6: -7,
        p7: 15500,
        p8: -14600,
        p9: 6000,
        h1: 75,
        h2: 362,
        h3: 0,
        h4: 313,
        h5: 50,
        h6: 30,
    };

    const ADC_T: i32 = 519888;
    const ADC_P: i32 = 415148;
    const ADC_H: i32 = 27000;
    const T_FINE: i32 = 128422;

    #[test]
    fn test_temperature_golden() {
        let (t, t_fine) = REFERENCE.compensate_temperature(ADC_T);
        assert_eq!(t_fine, T_FINE);
        assert_eq!(t, 2508);
    }

    #[test]
    fn test_pressure_golden() {
        assert_eq!(REFERENCE.compensate_pressure(ADC_P, T_FINE), 100656);
    }

    #[test]
    fn test_humidity_golden() {
        assert_eq!(REFERENCE.compensate_humidity(ADC_H, T_FINE), 39190);
        assert_eq!(REFERENCE.compensate_humidity(30000, T_FINE), 56317);
        assert_eq!(REFERENCE.compensate_humidity(0, T_FINE), 0);
    }

    #[test]
    fn test_pressure_low_adc() {
        // 3125 * (2^20 - adc_p - var2) reaches 2^31 here, so the quotient is
        // doubled after dividing
        assert_eq!(REFERENCE.compensate_pressure(0, T_FINE), 173204);
        assert_eq!(REFERENCE.compensate_pressure(0x10000, T_FINE), 161633);
        assert_eq!(REFERENCE.compensate_pressure(0x40000, T_FINE), 127187);
    }

    #[test]
    fn test_pressure_zero_divisor() {
        let cal = CalibrationSet { p1: 0, ..REFERENCE };
        assert_eq!(cal.compensate_pressure(ADC_P, T_FINE), 0);
        assert_eq!(cal.compensate_pressure(0, i32::MIN), 0);
        assert_eq!(cal.compensate_pressure(0xFFFFF, i32::MAX), 0);
    }

    #[test]
    fn test_humidity_clamped() {
        let adversarial = CalibrationSet {
            h1: u8::MAX,
            h2: i16::MAX,
            h3: u8::MAX,
            h4: i16::MIN,
            h5: i16::MAX,
            h6: i8::MIN,
            ..REFERENCE
        };
        assert_eq!(REFERENCE.compensate_humidity(0xFFFF, T_FINE), 102400);
        for cal in [REFERENCE, adversarial] {
            for adc_h in [0, 1, 0x7FFF, 0x8000, 0xFFFF] {
                for t_fine in [i32::MIN, -1_000_000, -76800, 0, 76800, T_FINE, 1_000_000, i32::MAX] {
                    let h = cal.compensate_humidity(adc_h, t_fine);
                    assert!(h <= 102400, "humidity {} out of range", h);
                }
            }
        }
    }

    #[test]
    fn test_fine_temperature_feeds_other_channels() {
        let warmer = T_FINE + 5000;
        assert_ne!(
            REFERENCE.compensate_humidity(ADC_H, T_FINE),
            REFERENCE.compensate_humidity(ADC_H, warmer)
        );
        assert_eq!(REFERENCE.compensate_humidity(ADC_H, warmer), 39195);
        assert_ne!(
            REFERENCE.compensate_pressure(ADC_P, T_FINE),
            REFERENCE.compensate_pressure(ADC_P, warmer)
        );
        assert_eq!(REFERENCE.compensate_pressure(ADC_P, warmer), 100807);
    }

    #[test]
    fn test_humidity_nibbles() {
        assert_eq!(humidity_nibbles(0x12, 0x34, 0x56), (0x124, 0x563));
        assert_eq!(humidity_nibbles(0x13, 0x29, 0x03), (313, 50));
        assert_eq!(humidity_nibbles(0xFF, 0xFF, 0xFF), (0xFFF, 0xFFF));
    }

    #[test]
    fn test_raw_sample_from_bytes() {
        let raw = RawSample::from_bytes(&[0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x69, 0x78]);
        assert_eq!(raw.pressure, ADC_P as u32);
        assert_eq!(raw.temperature, ADC_T as u32);
        assert_eq!(raw.humidity, ADC_H as u32);

        // the low nibble of the xlsb registers is not part of the code
        let raw = RawSample::from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(raw.pressure, 0xFFFFF);
        assert_eq!(raw.temperature, 0xFFFFF);
        assert_eq!(raw.humidity, 0xFFFF);
    }

    #[test]
    fn test_compensate_is_deterministic() {
        let raw = RawSample {
            pressure: ADC_P as u32,
            temperature: ADC_T as u32,
            humidity: ADC_H as u32,
        };
        let first = REFERENCE.compensate(&raw);
        let second = REFERENCE.compensate(&raw);
        assert_eq!(first.temperature.to_bits(), second.temperature.to_bits());
        assert_eq!(first.humidity.to_bits(), second.humidity.to_bits());
        assert_eq!(first.pressure.to_bits(), second.pressure.to_bits());

        assert_eq!(first.temperature, 2508 as f32 / 100.0);
        assert_eq!(first.humidity, 39190 as f32 / 1024.0);
        assert_eq!(first.pressure, 100656 as f32 / 100.0);
    }
}
