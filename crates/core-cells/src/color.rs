//! xterm 256-color palette resolution.

use crate::Rgb;

/// The 16 basic colors, as xterm ships them.
const BASIC: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(205, 0, 0),
    Rgb::new(0, 205, 0),
    Rgb::new(205, 205, 0),
    Rgb::new(0, 0, 238),
    Rgb::new(205, 0, 205),
    Rgb::new(0, 205, 205),
    Rgb::new(229, 229, 229),
    Rgb::new(127, 127, 127),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(92, 92, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 255, 255),
];

/// Resolve a palette index (`CSI 38;5;N m` and friends) to 24-bit color:
/// 16 basic colors, a 6x6x6 cube, then a 24-step grayscale ramp.
pub fn rgb_from_index(index: u8) -> Rgb {
    let index = index as u32;
    if index < 16 {
        return BASIC[index as usize];
    }

    // 6x6x6 cube
    if index < 232 {
        let x = index - 16;
        let b = x % 6;
        let g = (x / 6) % 6;
        let r = x / 36;
        return Rgb::new((r * 51) as u8, (g * 51) as u8, (b * 51) as u8);
    }

    // grayscale in 24 steps (tops out at 253)
    let x = index - 232;
    Rgb::new((x * 11) as u8, (x * 11) as u8, (x * 11) as u8)
}
