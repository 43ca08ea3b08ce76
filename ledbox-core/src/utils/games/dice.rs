//! Six-sided die drawn as a 5x5 glyph.

use rand_core::RngCore;
use smart_leds_trait::RGB8;

use crate::utils::controllers::leds::{scale, Frame, GREEN, MATRIX_LEDS};

type Glyph = [u8; MATRIX_LEDS];

/// Shown before the first roll.
const IDLE: Glyph = [
    0, 0, 0, 0, 0, //
    0, 0, 1, 0, 0, //
    0, 1, 1, 1, 0, //
    0, 0, 1, 0, 0, //
    0, 0, 0, 0, 0, //
];

const FACES: [Glyph; 6] = [
    [
        0, 0, 1, 0, 0, //
        0, 1, 1, 0, 0, //
        0, 0, 1, 0, 0, //
        0, 0, 1, 0, 0, //
        0, 1, 1, 1, 0, //
    ],
    [
        0, 1, 1, 0, 0, //
        0, 0, 0, 1, 0, //
        0, 0, 1, 0, 0, //
        0, 1, 0, 0, 0, //
        0, 1, 1, 1, 0, //
    ],
    [
        0, 1, 1, 0, 0, //
        0, 0, 0, 1, 0, //
        0, 1, 1, 1, 0, //
        0, 0, 0, 1, 0, //
        0, 1, 1, 0, 0, //
    ],
    [
        0, 1, 0, 1, 0, //
        0, 1, 0, 1, 0, //
        0, 1, 1, 1, 0, //
        0, 0, 0, 1, 0, //
        0, 0, 0, 1, 0, //
    ],
    [
        0, 1, 1, 1, 0, //
        0, 1, 0, 0, 0, //
        0, 1, 1, 0, 0, //
        0, 0, 0, 1, 0, //
        0, 1, 1, 0, 0, //
    ],
    [
        0, 0, 1, 1, 0, //
        0, 1, 0, 0, 0, //
        0, 1, 1, 0, 0, //
        0, 1, 0, 1, 0, //
        0, 0, 1, 0, 0, //
    ],
];

/// Dice color: green at 20 % brightness.
pub const DICE_COLOR: RGB8 = scale(GREEN, 1, 5);

/// Pixel delay of the reveal animation.
pub const REVEAL_STEP_MS: u64 = 10;

/// Roll a value in `1..=6`.
pub fn roll<R: RngCore>(rng: &mut R) -> u8 {
    (rng.next_u32() % 6) as u8 + 1
}

fn glyph(value: u8) -> &'static Glyph {
    match value {
        1..=6 => &FACES[value as usize - 1],
        _ => &IDLE,
    }
}

/// Lit cells of a face in strip order; values outside `1..=6` give the idle glyph.
pub fn lit_cells(value: u8) -> impl Iterator<Item = usize> {
    glyph(value)
        .iter()
        .enumerate()
        .filter(|(_, on)| **on != 0)
        .map(|(i, _)| i)
}

/// Frame showing the first `limit` lit cells of a face.
pub fn render(
    value: u8,
    limit: usize,
) -> Frame<MATRIX_LEDS> {
    let mut frame = [RGB8::default(); MATRIX_LEDS];
    for cell in lit_cells(value).take(limit) {
        frame[cell] = DICE_COLOR;
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u32);

    impl RngCore for Fixed {
        fn next_u32(&mut self) -> u32 {
            self.0
        }
        fn next_u64(&mut self) -> u64 {
            self.0 as u64
        }
        fn fill_bytes(
            &mut self,
            dst: &mut [u8],
        ) {
            dst.fill(self.0 as u8);
        }
    }

    #[test]
    fn test_roll_range() {
        assert_eq!(roll(&mut Fixed(0)), 1);
        assert_eq!(roll(&mut Fixed(5)), 6);
        assert_eq!(roll(&mut Fixed(6)), 1);
        assert_eq!(roll(&mut Fixed(u32::MAX)), (u32::MAX % 6) as u8 + 1);
    }

    #[test]
    fn test_glyph_pixel_counts() {
        let counts: [usize; 6] = core::array::from_fn(|i| lit_cells(i as u8 + 1).count());
        assert_eq!(counts, [8, 8, 9, 9, 9, 8]);
        assert_eq!(lit_cells(0).count(), 5);
    }

    #[test]
    fn test_render_partial_reveal() {
        let full = render(3, usize::MAX);
        assert_eq!(full.iter().filter(|c| **c == DICE_COLOR).count(), 9);
        let partial = render(3, 2);
        assert_eq!(partial[1], DICE_COLOR);
        assert_eq!(partial[2], DICE_COLOR);
        assert_eq!(partial[8], RGB8::default());
    }
}
