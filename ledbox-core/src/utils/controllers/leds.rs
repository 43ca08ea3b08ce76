//! LED control module for the LED matrix.
//!
//! Drives an addressable strip via `SmartLedsWrite`, renders full frames for
//! the games and dispatches `LEDCommand`s for the toggle demo.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::{Deserialize, Serialize};
use smart_leds_trait::{SmartLedsWrite, RGB8};

/// Channel used to receive LED commands (`LEDCommand` messages).
pub static LED_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, LEDCommand, 16> =
    embassy_sync::channel::Channel::new();

/// Number of LEDs on the 5x5 matrix.
pub const MATRIX_LEDS: usize = 25;

/// One color per pixel, in strip order.
pub type Frame<const N: usize> = [RGB8; N];

pub const OFF: RGB8 = RGB8 { r: 0, g: 0, b: 0 };
pub const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
pub const GREEN: RGB8 = RGB8 { r: 0, g: 255, b: 0 };

/// Static picture shown by the blink demo.
pub const BLINK_PATTERN: Frame<MATRIX_LEDS> = {
    const R: RGB8 = RGB8 { r: 63, g: 0, b: 0 };
    const B: RGB8 = RGB8 { r: 13, g: 38, b: 63 };
    const O: RGB8 = OFF;
    [
        O, R, R, R, O, //
        R, R, B, B, B, //
        R, R, B, B, B, //
        R, R, R, R, O, //
        O, R, O, R, O, //
    ]
};

/// Scale a color by `num / den`.
pub const fn scale(
    color: RGB8,
    num: u8,
    den: u8,
) -> RGB8 {
    if den == 0 {
        return OFF;
    }
    RGB8 {
        r: scale_channel(color.r, num, den),
        g: scale_channel(color.g, num, den),
        b: scale_channel(color.b, num, den),
    }
}

const fn scale_channel(
    c: u8,
    num: u8,
    den: u8,
) -> u8 {
    let v = c as u16 * num as u16 / den as u16;
    if v > 255 {
        255
    } else {
        v as u8
    }
}

/// LED command variants for switching on/off or setting a color.
///
/// Serialized as JSON with tag `"lc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "lc", rename_all = "snake_case")]
pub enum LEDCommand {
    /// Turn the LEDs on (last color or red).
    On,
    /// Turn all LEDs off (set to black).
    Off,
    /// Flip between on and off.
    Toggle,
    /// Set the color, applied immediately if the strip is on.
    SC { r: u8, g: u8, b: u8 },
    /// Paint the whole strip now, without changing the on/off state.
    Fill { r: u8, g: u8, b: u8 },
    /// Show the blink pattern.
    Pattern,
}

/// High-level LED controller that drives a strip of `N` addressable LEDs.
///
/// Maintains the on/off state and last selected color.
pub struct LedModule<Driver, const N: usize = MATRIX_LEDS> {
    driver: Driver,
    is_on: bool,
    last_color: Option<RGB8>,
}

impl<Driver, E, const N: usize> LedModule<Driver, N>
where
    Driver: SmartLedsWrite<Color = RGB8, Error = E>,
{
    /// Create a new `LedModule` over the given LED driver.
    ///
    /// The strip is initially off with no last color.
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            is_on: false,
            last_color: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Execute an incoming `LEDCommand`, updating internal state and LED strip.
    pub fn ex_command(
        &mut self,
        cmd: LEDCommand,
    ) -> Result<(), E> {
        match cmd {
            LEDCommand::On => {
                self.is_on = true;
                self.set_all(self.last_color.unwrap_or(RED))?;
            }
            LEDCommand::Off => {
                self.is_on = false;
                self.clear()?;
            }
            LEDCommand::Toggle => {
                let next = if self.is_on { LEDCommand::Off } else { LEDCommand::On };
                return self.ex_command(next);
            }
            LEDCommand::SC { r, g, b } => {
                let new_color = RGB8 { r, g, b };
                self.last_color = Some(new_color);
                if self.is_on {
                    self.set_all(new_color)?;
                }
            }
            LEDCommand::Fill { r, g, b } => self.set_all(RGB8 { r, g, b })?,
            LEDCommand::Pattern => {
                let data = BLINK_PATTERN
                    .iter()
                    .copied()
                    .chain(core::iter::repeat(OFF))
                    .take(N);
                self.driver.write(data)?;
            }
        }
        Ok(())
    }

    /// Write a full frame to the strip.
    pub fn show(
        &mut self,
        frame: &Frame<N>,
    ) -> Result<(), E> {
        self.driver.write(frame.iter().copied())
    }

    /// Set all LEDs in the strip to the specified color.
    pub fn set_all(
        &mut self,
        color: RGB8,
    ) -> Result<(), E> {
        let data = core::iter::repeat(color).take(N);
        self.driver.write(data)
    }

    pub fn clear(&mut self) -> Result<(), E> {
        self.set_all(OFF)
    }
}
