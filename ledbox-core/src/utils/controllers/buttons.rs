//! Push buttons wired active low with the internal pull-up enabled.

use embassy_time::Timer;
use embedded_hal::digital::InputPin;

/// Gap between the two reads of [`Button::confirm_pressed`].
pub const CONFIRM_DELAY_MS: u64 = 50;

/// A single push button.
pub struct Button<P> {
    pin: P,
    was_high: bool,
}

impl<P: InputPin> Button<P> {
    /// Wrap a pin; the button is assumed released (high) at start.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            was_high: true,
        }
    }

    /// Current level, `true` while held down.
    pub fn is_pressed(&mut self) -> Result<bool, P::Error> {
        self.pin.is_low()
    }

    /// Report a press once, on the high -> low transition.
    pub fn poll_pressed(&mut self) -> Result<bool, P::Error> {
        let high = self.pin.is_high()?;
        let pressed = self.was_high && !high;
        self.was_high = high;
        Ok(pressed)
    }

    /// Level-triggered press that must still read low after
    /// [`CONFIRM_DELAY_MS`]. The gap is awaited, so other tasks keep running.
    pub async fn confirm_pressed(&mut self) -> Result<bool, P::Error> {
        if !self.pin.is_low()? {
            return Ok(false);
        }
        Timer::after_millis(CONFIRM_DELAY_MS).await;
        self.pin.is_low()
    }

    pub fn release(self) -> P {
        self.pin
    }
}
