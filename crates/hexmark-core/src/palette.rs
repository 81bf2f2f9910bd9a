//! Fixed annotation palette.
//!
//! Colors are handed out cyclically in creation order. The `.hva` format
//! stores the raw `0x00BBGGRR` value of the assigned color, so the palette
//! order and values are part of the file format.

/// Number of colors in the palette
pub const PALETTE_SIZE: usize = 6;

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Creates a color from its channels
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color as `0x00BBGGRR`, the layout persisted in `.hva` files
    pub const fn to_raw(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16)
    }

    /// Unpacks a `0x00BBGGRR` value; the high byte is ignored
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            r: (raw & 0xFF) as u8,
            g: ((raw >> 8) & 0xFF) as u8,
            b: ((raw >> 16) & 0xFF) as u8,
        }
    }
}

/// The annotation colors, in assignment order
pub const PALETTE: [Rgb; PALETTE_SIZE] = [
    Rgb::new(220, 50, 47),
    Rgb::new(38, 139, 210),
    Rgb::new(133, 153, 0),
    Rgb::new(211, 54, 130),
    Rgb::new(203, 75, 22),
    Rgb::new(42, 161, 152),
];

/// Color index for the annotation created after `existing` others
pub fn color_for_position(existing: usize) -> usize {
    existing % PALETTE_SIZE
}

/// Returns the palette color for an index, wrapping out-of-range indices
pub fn color(index: usize) -> Rgb {
    PALETTE[index % PALETTE_SIZE]
}

/// Maps a persisted raw color back to its palette index
pub fn index_of_raw(raw: u32) -> Option<usize> {
    PALETTE.iter().position(|c| c.to_raw() == raw & 0x00FF_FFFF)
}
