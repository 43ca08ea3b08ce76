//! SHTC3 temperature/humidity sensor on a shared I2C bus.
//!
//! The bus is shared through `embedded-hal-bus`'s `RefCellDevice`, so other
//! devices can sit next to the sensor. A measurement is one command write, a
//! fixed wait, then a 6-byte read of two CRC-protected words.

use core::cell::RefCell;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use embedded_hal_bus::i2c::RefCellDevice;
use serde::Serialize;

/// Default I2C address of the SHTC3.
pub const SHTC3_ADDRESS: u8 = 0x70;

/// Normal mode, clock stretching disabled, temperature first.
const MEASURE_CMD: [u8; 2] = [0x78, 0x66];

/// Worst-case conversion time in normal mode.
const MEASURE_WAIT_MS: u32 = 20;

/// Errors that can occur when talking to I2C-based sensors.
#[derive(Debug)]
pub enum SensorError<E: core::fmt::Debug> {
    Bus(E),
    /// A data word failed its CRC check.
    Crc { expected: u8, found: u8 },
}

/// One climate reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Climate {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

/// Sensirion CRC-8: polynomial 0x31, init 0xFF, no reflection.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// SHTC3 driver over a shared I2C bus.
pub struct Shtc3<'a, I2C: 'static> {
    dev: RefCellDevice<'a, I2C>,
    address: u8,
}

impl<'a, I2C, E> Shtc3<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    pub fn new(i2c_bus: &'a RefCell<I2C>) -> Self {
        Self {
            dev: RefCellDevice::new(i2c_bus),
            address: SHTC3_ADDRESS,
        }
    }

    /// Trigger a measurement and convert the result.
    pub fn read<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<Climate, SensorError<E>> {
        self.dev
            .write(self.address, &MEASURE_CMD)
            .map_err(SensorError::Bus)?;
        delay.delay_ms(MEASURE_WAIT_MS);

        let mut data = [0u8; 6];
        self.dev
            .read(self.address, &mut data)
            .map_err(SensorError::Bus)?;

        let temp_raw = checked_word(&data[0..3])?;
        let hum_raw = checked_word(&data[3..6])?;
        let climate = convert(temp_raw, hum_raw);
        tracing::debug!(?climate, "SHTC3 read");
        Ok(climate)
    }
}

fn checked_word<E: core::fmt::Debug>(chunk: &[u8]) -> Result<u16, SensorError<E>> {
    let expected = crc8(&chunk[..2]);
    if expected != chunk[2] {
        return Err(SensorError::Crc {
            expected,
            found: chunk[2],
        });
    }
    Ok(u16::from_be_bytes([chunk[0], chunk[1]]))
}

/// Raw words to °C and %RH per the datasheet formulas.
pub fn convert(
    temp_raw: u16,
    hum_raw: u16,
) -> Climate {
    Climate {
        temperature: 175.0 * temp_raw as f32 / 65536.0 - 45.0,
        humidity: 100.0 * hum_raw as f32 / 65536.0,
    }
}
