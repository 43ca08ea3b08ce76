//! ICM-42688-P accelerometer on an SPI device.
//!
//! Register reads set bit 7 of the address byte, writes clear it. The
//! accelerometer runs at ±2 g, so one LSB is 1/16384 g.

use embedded_hal::{delay::DelayNs, spi::SpiDevice};
use serde::Serialize;

const REG_DEVICE_CONFIG: u8 = 0x06;
const REG_INT_CONFIG1: u8 = 0x11;
const REG_ACCEL_DATA_X1: u8 = 0x1F;
const REG_PWR_MGMT0: u8 = 0x4E;
const REG_ACCEL_CONFIG0: u8 = 0x50;

const READ_FLAG: u8 = 0x80;
const LSB_PER_G: f32 = 16384.0;

/// Acceleration in g.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub struct Icm42688p<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Icm42688p<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    /// Soft reset, leave standby and enable the accelerometer in low-noise
    /// mode at ±2 g / 1 kHz.
    pub fn init<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<(), SPI::Error> {
        self.write_register(REG_DEVICE_CONFIG, 0x01)?;
        delay.delay_ms(100);
        self.write_register(REG_INT_CONFIG1, 0x00)?;
        delay.delay_ms(10);
        self.write_register(REG_PWR_MGMT0, 0x0F)?;
        delay.delay_ms(10);
        self.write_register(REG_ACCEL_CONFIG0, 0x03)?;
        tracing::info!("ICM42688P initialized");
        Ok(())
    }

    pub fn read_register(
        &mut self,
        reg: u8,
    ) -> Result<u8, SPI::Error> {
        let mut buf = [reg | READ_FLAG, 0x00];
        self.spi.transfer_in_place(&mut buf)?;
        Ok(buf[1])
    }

    pub fn write_register(
        &mut self,
        reg: u8,
        val: u8,
    ) -> Result<(), SPI::Error> {
        self.spi.write(&[reg & !READ_FLAG, val])
    }

    /// Burst-read the three axes.
    pub fn read_accel_g(&mut self) -> Result<Acceleration, SPI::Error> {
        let mut buf = [0u8; 7];
        buf[0] = REG_ACCEL_DATA_X1 | READ_FLAG;
        self.spi.transfer_in_place(&mut buf)?;

        let axis = |lo: usize| i16::from_le_bytes([buf[lo], buf[lo + 1]]) as f32 / LSB_PER_G;
        Ok(Acceleration {
            x: axis(1),
            y: axis(3),
            z: axis(5),
        })
    }
}
