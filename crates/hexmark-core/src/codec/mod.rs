//! Typed decoding of raw bytes into display text.
//!
//! Two entry points cover the two ways bytes are looked at:
//!
//! - [`format_span`] decodes an annotated range under one of the six
//!   [`DisplayFormat`]s. The requested length is clamped to the buffer.
//! - [`format_at_offset`] decodes a fixed-width [`PrimitiveType`] at a single
//!   offset for the read-out grid. It never clamps: a short buffer yields
//!   [`Readout::NotEnoughData`].
//!
//! All multi-byte values are little-endian.

mod primitive;

use crate::error::{Error, Result};
use std::fmt::{self, Write as _};
use std::str::FromStr;

pub use primitive::{format_at_offset, readout_table, PrimitiveType, Readout};

/// Placeholder emitted when a float/double span is shorter than the value
pub const INSUFFICIENT_BYTES: &str = "Insufficient bytes";

/// Display format of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayFormat {
    /// Two uppercase hex digits plus a space per byte
    #[default]
    Hex,
    /// Signed little-endian integer, width taken from the span length
    Int,
    /// IEEE-754 single precision, six fractional digits
    Float,
    /// IEEE-754 double precision, six fractional digits
    Double,
    /// Printable ASCII, `.` for anything else
    Ascii,
    /// Every other byte as printable ASCII; not a real UTF-16 decode
    Unicode,
}

impl DisplayFormat {
    /// Every format, in menu order
    pub const ALL: [DisplayFormat; 6] = [
        DisplayFormat::Hex,
        DisplayFormat::Int,
        DisplayFormat::Float,
        DisplayFormat::Double,
        DisplayFormat::Ascii,
        DisplayFormat::Unicode,
    ];

    /// Returns the format name as stored in `.hva` files
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayFormat::Hex => "hex",
            DisplayFormat::Int => "int",
            DisplayFormat::Float => "float",
            DisplayFormat::Double => "double",
            DisplayFormat::Ascii => "ascii",
            DisplayFormat::Unicode => "unicode",
        }
    }
}

impl fmt::Display for DisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "hex" => Ok(DisplayFormat::Hex),
            "int" => Ok(DisplayFormat::Int),
            "float" => Ok(DisplayFormat::Float),
            "double" => Ok(DisplayFormat::Double),
            "ascii" => Ok(DisplayFormat::Ascii),
            "unicode" => Ok(DisplayFormat::Unicode),
            _ => Err(Error::unknown_format(value)),
        }
    }
}

impl TryFrom<&str> for DisplayFormat {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// Decode `length` bytes starting at `offset` under `format`.
///
/// The span is clamped so it never runs past the end of `data`; an offset at
/// or beyond the end decodes an empty span.
pub fn format_span(data: &[u8], offset: usize, length: usize, format: DisplayFormat) -> String {
    let start = offset.min(data.len());
    let end = offset.saturating_add(length).min(data.len());
    let span = &data[start..end];

    match format {
        DisplayFormat::Hex => {
            let mut out = String::with_capacity(span.len() * 3);
            for byte in span {
                let _ = write!(out, "{:02X} ", byte);
            }
            out
        }
        DisplayFormat::Int => format_int(span),
        DisplayFormat::Float => match span.get(..4) {
            Some(bytes) => {
                let value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                format!("{:.6}", value)
            }
            None => INSUFFICIENT_BYTES.to_string(),
        },
        DisplayFormat::Double => match span.get(..8).and_then(|b| <[u8; 8]>::try_from(b).ok()) {
            Some(bytes) => format!("{:.6}", f64::from_le_bytes(bytes)),
            None => INSUFFICIENT_BYTES.to_string(),
        },
        DisplayFormat::Ascii => span.iter().map(|&b| printable(b)).collect(),
        DisplayFormat::Unicode => span.iter().step_by(2).map(|&b| printable(b)).collect(),
    }
}

/// Signed decimal whose width follows the span length.
///
/// Lengths other than 1, 2, 4 and 8 are accumulated into a 32-bit value;
/// bytes past the fourth fall off the top.
fn format_int(span: &[u8]) -> String {
    match *span {
        [a] => (a as i8).to_string(),
        [a, b] => i16::from_le_bytes([a, b]).to_string(),
        [a, b, c, d] => i32::from_le_bytes([a, b, c, d]).to_string(),
        [a, b, c, d, e, f, g, h] => i64::from_le_bytes([a, b, c, d, e, f, g, h]).to_string(),
        _ => {
            let value = span.iter().enumerate().fold(0u32, |acc, (i, &byte)| {
                let shifted = u32::try_from(i * 8)
                    .ok()
                    .and_then(|shift| u32::from(byte).checked_shl(shift))
                    .unwrap_or(0);
                acc | shifted
            });
            (value as i32).to_string()
        }
    }
}

/// Printable ASCII maps to itself, everything else to `.`
pub(crate) fn printable(byte: u8) -> char {
    if (0x20..=0x7E).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}
