//! Hobby servo on a PWM channel.
//!
//! Standard timing at 50 Hz (20 ms period): 0.5 ms = 0°, 2.5 ms = 180°.

use embedded_hal::pwm::SetDutyCycle;

/// Servo pulse width range in microseconds
pub const PULSE_MIN_US: u16 = 500;
pub const PULSE_MAX_US: u16 = 2500;

/// PWM period in microseconds (50Hz = 20ms)
pub const PERIOD_US: u16 = 20_000;

pub const MAX_ANGLE: u16 = 180;

/// Servo driver - wraps a PWM channel
pub struct Servo<P> {
    pwm: P,
    angle: u16,
}

impl<P: SetDutyCycle> Servo<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, angle: 0 }
    }

    /// Pulse width for an angle, clamped to [`MAX_ANGLE`].
    pub fn pulse_us(angle: u16) -> u16 {
        let angle = angle.min(MAX_ANGLE) as u32;
        let range = (PULSE_MAX_US - PULSE_MIN_US) as u32;
        PULSE_MIN_US + (range * angle / MAX_ANGLE as u32) as u16
    }

    /// Set servo angle (0-180 degrees)
    pub fn set_angle(
        &mut self,
        angle: u16,
    ) -> Result<(), P::Error> {
        let angle = angle.min(MAX_ANGLE);
        self.pwm
            .set_duty_cycle_fraction(Self::pulse_us(angle), PERIOD_US)?;
        self.angle = angle;
        tracing::debug!(angle, "servo moved");
        Ok(())
    }

    /// Last commanded angle
    pub fn angle(&self) -> u16 {
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::ErrorType;

    /// Duty register with one tick per microsecond of the 20 ms period.
    struct Channel {
        duty: u16,
    }

    impl ErrorType for Channel {
        type Error = Infallible;
    }

    impl SetDutyCycle for Channel {
        fn max_duty_cycle(&self) -> u16 {
            PERIOD_US
        }

        fn set_duty_cycle(
            &mut self,
            duty: u16,
        ) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn test_angles_map_to_pulse_widths() {
        let mut servo = Servo::new(Channel { duty: 0 });
        servo.set_angle(0).unwrap();
        assert_eq!(servo.pwm.duty, 500);
        servo.set_angle(90).unwrap();
        assert_eq!(servo.pwm.duty, 1500);
        servo.set_angle(180).unwrap();
        assert_eq!(servo.pwm.duty, 2500);
    }

    #[test]
    fn test_angle_is_clamped() {
        let mut servo = Servo::new(Channel { duty: 0 });
        servo.set_angle(270).unwrap();
        assert_eq!(servo.angle(), 180);
        assert_eq!(servo.pwm.duty, 2500);
    }
}
