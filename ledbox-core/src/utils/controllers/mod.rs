//! Module Exports
//!
//! Hardware-facing drivers shared by the demos.
//!
//! - `leds`: addressable LED strip / matrix
//! - `buttons`: active-low push buttons
//! - `servo`: PWM hobby servo for the door lock
//! - `i2c`: SHTC3 climate sensor on a shared I2C bus
//! - `spi`: ICM42688P accelerometer

pub mod buttons;
/// Module for I2C-connected sensors.
pub mod i2c;
pub mod leds;
pub mod servo;
pub mod spi;

pub use buttons::Button;
pub use leds::{LEDCommand, LedModule, LED_CHANNEL};
pub use servo::Servo;
