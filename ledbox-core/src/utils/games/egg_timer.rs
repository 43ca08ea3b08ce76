//! Kitchen timer on the LED matrix.
//!
//! Button 1 picks 1..=15 minutes, button 2 starts the countdown. While
//! running, the top row shows remaining minutes in binary (white), the second
//! row remaining seconds in binary (blue) and the bottom two rows fade from
//! red to green. When the time is up the bottom rows blink five times.
//!
//! All timing is in ticks of [`TICK_MS`].

use serde::Serialize;
use smart_leds_trait::RGB8;

use crate::utils::controllers::leds::{Frame, MATRIX_LEDS};

pub const TICK_MS: u64 = 100;
pub const MAX_MINUTES: u8 = 15;
pub const BRIGHTNESS: u8 = 64;

const TICKS_PER_SECOND: u32 = 10;
const TICKS_PER_MINUTE: u32 = 60 * TICKS_PER_SECOND;

/// Alarm: five 500 ms on / 500 ms off cycles.
const BLINK_HALF_PERIOD: u32 = 5;
const ALARM_TICKS: u32 = 5 * 2 * BLINK_HALF_PERIOD;

const MINUTE_BITS: usize = 0;
const SECOND_BITS: usize = 5;
const PROGRESS: core::ops::Range<usize> = 15..25;
const ALARM_COLOR: RGB8 = RGB8 { r: 0, g: 16, b: 0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EggTimer {
    /// Choosing the duration.
    Setting { minutes: u8 },
    /// Counting down; buttons are ignored.
    Running {
        minutes: u8,
        remaining: u32,
        total: u32,
    },
    /// Blinking after the countdown; returns to `Setting` on its own.
    Alarm { minutes: u8, elapsed: u32 },
}

impl Default for EggTimer {
    fn default() -> Self {
        EggTimer::Setting { minutes: 1 }
    }
}

impl EggTimer {
    /// Button 1: next duration, wrapping 15 -> 1.
    pub fn cycle_minutes(&mut self) {
        if let EggTimer::Setting { minutes } = self {
            *minutes = *minutes % MAX_MINUTES + 1;
            tracing::info!(minutes = *minutes, "time set");
        }
    }

    /// Button 2: start the countdown.
    pub fn start(&mut self) {
        if let EggTimer::Setting { minutes } = *self {
            let total = minutes as u32 * TICKS_PER_MINUTE;
            tracing::info!(minutes, "starting timer");
            *self = EggTimer::Running {
                minutes,
                remaining: total,
                total,
            };
        }
    }

    /// Advance by one tick.
    pub fn tick(&mut self) {
        *self = match *self {
            EggTimer::Running {
                minutes,
                remaining,
                total,
            } => {
                if remaining <= 1 {
                    tracing::info!("timer finished");
                    EggTimer::Alarm {
                        minutes,
                        elapsed: 0,
                    }
                } else {
                    EggTimer::Running {
                        minutes,
                        remaining: remaining - 1,
                        total,
                    }
                }
            }
            EggTimer::Alarm { minutes, elapsed } if elapsed + 1 >= ALARM_TICKS => {
                EggTimer::Setting { minutes }
            }
            EggTimer::Alarm { minutes, elapsed } => EggTimer::Alarm {
                minutes,
                elapsed: elapsed + 1,
            },
            setting => setting,
        };
    }

    pub fn render(&self) -> Frame<MATRIX_LEDS> {
        let mut frame = [RGB8::default(); MATRIX_LEDS];
        match *self {
            EggTimer::Setting { minutes } => {
                let lit = RGB8 {
                    r: 0,
                    g: BRIGHTNESS,
                    b: 0,
                };
                for px in frame.iter_mut().take(minutes as usize) {
                    *px = lit;
                }
            }
            EggTimer::Running {
                remaining, total, ..
            } => {
                let minutes = remaining / TICKS_PER_MINUTE;
                let seconds = (remaining % TICKS_PER_MINUTE) / TICKS_PER_SECOND;
                let white = RGB8 {
                    r: BRIGHTNESS,
                    g: BRIGHTNESS,
                    b: BRIGHTNESS,
                };
                let blue = RGB8 {
                    r: 0,
                    g: 0,
                    b: BRIGHTNESS,
                };
                draw_bits(&mut frame, MINUTE_BITS, minutes, white);
                draw_bits(&mut frame, SECOND_BITS, seconds, blue);

                let done = (total - remaining) as u64;
                let green = (done * BRIGHTNESS as u64 / total as u64) as u8;
                let fade = RGB8 {
                    r: BRIGHTNESS - green,
                    g: green,
                    b: 0,
                };
                for px in &mut frame[PROGRESS] {
                    *px = fade;
                }
            }
            EggTimer::Alarm { elapsed, .. } => {
                if (elapsed / BLINK_HALF_PERIOD) % 2 == 0 {
                    for px in &mut frame[PROGRESS] {
                        *px = ALARM_COLOR;
                    }
                }
            }
        }
        frame
    }
}

/// Five bits, most significant on the leftmost pixel. Higher bits are dropped.
fn draw_bits(
    frame: &mut Frame<MATRIX_LEDS>,
    start: usize,
    value: u32,
    color: RGB8,
) {
    for bit in 0..5 {
        if (value >> (4 - bit)) & 1 == 1 {
            frame[start + bit] = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_wrap_after_fifteen() {
        let mut t = EggTimer::default();
        for _ in 0..14 {
            t.cycle_minutes();
        }
        assert_eq!(t, EggTimer::Setting { minutes: 15 });
        t.cycle_minutes();
        assert_eq!(t, EggTimer::Setting { minutes: 1 });
    }

    #[test]
    fn test_setting_frame_lights_one_pixel_per_minute() {
        let t = EggTimer::Setting { minutes: 3 };
        let frame = t.render();
        assert_eq!(frame.iter().filter(|c| c.g == BRIGHTNESS).count(), 3);
        assert_eq!(frame[3], RGB8::default());
    }

    #[test]
    fn test_running_frame_shows_binary_time_and_progress() {
        let mut t = EggTimer::Setting { minutes: 2 };
        t.start();
        // 2 minutes = 1200 ticks; after 1 tick: 1:59.9 left.
        t.tick();
        let frame = t.render();
        // minutes = 1 -> 00001
        assert_eq!(frame[4].r, BRIGHTNESS);
        assert!(frame[0..4].iter().all(|c| *c == RGB8::default()));
        // seconds = 59 -> 11011 in five bits (bit 5 dropped)
        let blue: [bool; 5] = core::array::from_fn(|i| frame[5 + i].b == BRIGHTNESS);
        assert_eq!(blue, [true, true, false, true, true]);
        // barely started: mostly red
        assert_eq!(frame[20].r, BRIGHTNESS);
        assert_eq!(frame[20].g, 0);
    }

    #[test]
    fn test_buttons_ignored_while_running() {
        let mut t = EggTimer::Setting { minutes: 1 };
        t.start();
        let before = t;
        t.cycle_minutes();
        t.start();
        assert_eq!(t, before);
    }

    #[test]
    fn test_countdown_alarm_and_return_to_setting() {
        let mut t = EggTimer::Setting { minutes: 1 };
        t.start();
        for _ in 0..600 {
            t.tick();
        }
        assert_eq!(
            t,
            EggTimer::Alarm {
                minutes: 1,
                elapsed: 0
            }
        );
        assert_eq!(t.render()[15], ALARM_COLOR);
        for _ in 0..5 {
            t.tick();
        }
        assert_eq!(t.render()[15], RGB8::default());
        for _ in 0..45 {
            t.tick();
        }
        assert_eq!(t, EggTimer::Setting { minutes: 1 });
    }
}
