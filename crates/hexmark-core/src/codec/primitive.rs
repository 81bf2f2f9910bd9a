//! Fixed-width read-outs at a single offset.

use super::printable;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use std::fmt;

/// Upper bound on characters shown for [`PrimitiveType::AsciiString`]
const MAX_ASCII_CHARS: usize = 32;

/// Upper bound on samples shown for [`PrimitiveType::UnicodeString`]
const MAX_UNICODE_CHARS: usize = 16;

/// Rendering used by all three time types
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Smallest OLE automation date accepted (0100-01-01)
const OLE_MIN: f64 = -657_434.0;

/// Largest OLE automation date accepted (9999-12-31 23:59:59)
const OLE_MAX: f64 = 2_958_466.0;

/// Years an OLE date may land in once rounded to the second
const OLE_YEARS: std::ops::RangeInclusive<i32> = 100..=9999;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Primitive types shown in the read-out grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Signed 8-bit integer
    I8,
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 32-bit integer
    U32,
    /// IEEE-754 single precision
    F32,
    /// IEEE-754 double precision
    F64,
    /// Zero-terminated ASCII, at most 32 bytes
    AsciiString,
    /// Zero-terminated 16-bit samples, at most 16, rendered as ASCII
    UnicodeString,
    /// 32-bit seconds since the Unix epoch
    Time32,
    /// 64-bit seconds since the Unix epoch
    Time64,
    /// OLE automation date: days since 1899-12-30 as a double
    OleDate,
}

impl PrimitiveType {
    /// Every type, in grid order
    pub const ALL: [PrimitiveType; 13] = [
        PrimitiveType::I8,
        PrimitiveType::U8,
        PrimitiveType::I16,
        PrimitiveType::U16,
        PrimitiveType::I32,
        PrimitiveType::U32,
        PrimitiveType::F32,
        PrimitiveType::F64,
        PrimitiveType::AsciiString,
        PrimitiveType::UnicodeString,
        PrimitiveType::Time32,
        PrimitiveType::Time64,
        PrimitiveType::OleDate,
    ];

    /// Returns the label shown in the grid's type column
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::I8 => "Byte (8-bit)",
            PrimitiveType::U8 => "Unsigned Byte",
            PrimitiveType::I16 => "Short (16-bit)",
            PrimitiveType::U16 => "Unsigned Short",
            PrimitiveType::I32 => "Int (32-bit)",
            PrimitiveType::U32 => "Unsigned Int",
            PrimitiveType::F32 => "Float",
            PrimitiveType::F64 => "Double",
            PrimitiveType::AsciiString => "ASCII String",
            PrimitiveType::UnicodeString => "Unicode String",
            PrimitiveType::Time32 => "time_t",
            PrimitiveType::Time64 => "time64_t",
            PrimitiveType::OleDate => "OLE Time",
        }
    }

    /// Bytes that must remain at the offset before anything is decoded
    pub fn min_bytes(&self) -> usize {
        match self {
            PrimitiveType::I8 | PrimitiveType::U8 | PrimitiveType::AsciiString => 1,
            PrimitiveType::I16 | PrimitiveType::U16 | PrimitiveType::UnicodeString => 2,
            PrimitiveType::I32 | PrimitiveType::U32 | PrimitiveType::F32 | PrimitiveType::Time32 => 4,
            PrimitiveType::F64 | PrimitiveType::Time64 | PrimitiveType::OleDate => 8,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a single read-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readout {
    /// The decoded text
    Value(String),
    /// Fewer bytes remain than the type needs
    NotEnoughData,
    /// The bytes decode to a time outside the representable calendar
    InvalidTime,
}

impl Readout {
    /// Returns the decoded text, if any
    pub fn value(&self) -> Option<&str> {
        match self {
            Readout::Value(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readout::Value(s) => f.write_str(s),
            Readout::NotEnoughData => f.write_str("Not enough data"),
            Readout::InvalidTime => f.write_str("Invalid time"),
        }
    }
}

/// Decode the bytes at `offset` as `ty`.
pub fn format_at_offset(data: &[u8], offset: usize, ty: PrimitiveType) -> Readout {
    let bytes = data.get(offset..).unwrap_or_default();
    if bytes.len() < ty.min_bytes() {
        return Readout::NotEnoughData;
    }

    let text = match ty {
        PrimitiveType::I8 => {
            let v = bytes[0] as i8;
            format!("{} (0x{:x})", v, v as u8)
        }
        PrimitiveType::U8 => format!("{} (0x{:x})", bytes[0], bytes[0]),
        PrimitiveType::I16 => {
            let v = i16::from_le_bytes(array(bytes));
            format!("{} (0x{:x})", v, v as u16)
        }
        PrimitiveType::U16 => {
            let v = u16::from_le_bytes(array(bytes));
            format!("{} (0x{:x})", v, v)
        }
        PrimitiveType::I32 => {
            let v = i32::from_le_bytes(array(bytes));
            format!("{} (0x{:x})", v, v as u32)
        }
        PrimitiveType::U32 => {
            let v = u32::from_le_bytes(array(bytes));
            format!("{} (0x{:x})", v, v)
        }
        PrimitiveType::F32 => format!("{:.6}", f32::from_le_bytes(array(bytes))),
        PrimitiveType::F64 => format!("{:.10}", f64::from_le_bytes(array(bytes))),
        PrimitiveType::AsciiString => bytes
            .iter()
            .take(MAX_ASCII_CHARS)
            .take_while(|&&b| b != 0)
            .map(|&b| printable(b))
            .collect(),
        PrimitiveType::UnicodeString => bytes
            .chunks_exact(2)
            .take(MAX_UNICODE_CHARS)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .map(|unit| u8::try_from(unit).map_or('.', printable))
            .collect(),
        PrimitiveType::Time32 => {
            return unix_time(i64::from(i32::from_le_bytes(array(bytes))));
        }
        PrimitiveType::Time64 => return unix_time(i64::from_le_bytes(array(bytes))),
        PrimitiveType::OleDate => return ole_date(f64::from_le_bytes(array(bytes))),
    };

    Readout::Value(text)
}

/// Read-outs for every primitive type at `offset`, in grid order
pub fn readout_table(data: &[u8], offset: usize) -> Vec<(PrimitiveType, Readout)> {
    PrimitiveType::ALL
        .iter()
        .map(|&ty| (ty, format_at_offset(data, offset, ty)))
        .collect()
}

/// Leading `N` bytes as an array; callers have checked the length
fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn unix_time(seconds: i64) -> Readout {
    match DateTime::from_timestamp(seconds, 0) {
        Some(t) => Readout::Value(t.format(TIME_FORMAT).to_string()),
        None => Readout::InvalidTime,
    }
}

/// Convert an OLE automation date.
///
/// The integer part counts days from 1899-12-30 and may be negative; the
/// fractional part is always the time of day, regardless of sign. The time is
/// rounded to the nearest second.
fn ole_date(value: f64) -> Readout {
    if !value.is_finite() || !(OLE_MIN..OLE_MAX).contains(&value) {
        return Readout::InvalidTime;
    }

    let days = value.trunc();
    let seconds = ((value - days).abs() * SECONDS_PER_DAY).round();
    let total = days as i64 * 86_400 + seconds as i64;

    let epoch: Option<NaiveDateTime> =
        NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0));
    let converted = epoch
        .zip(TimeDelta::try_seconds(total))
        .and_then(|(epoch, delta)| epoch.checked_add_signed(delta))
        .filter(|t| OLE_YEARS.contains(&t.year()));

    match converted {
        Some(t) => Readout::Value(t.format(TIME_FORMAT).to_string()),
        None => Readout::InvalidTime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(data: &[u8], offset: usize, ty: PrimitiveType) -> String {
        format_at_offset(data, offset, ty).to_string()
    }

    #[test]
    fn test_integers() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(text(&data, 0, PrimitiveType::I8), "-1 (0xff)");
        assert_eq!(text(&data, 0, PrimitiveType::U8), "255 (0xff)");
        assert_eq!(text(&data, 0, PrimitiveType::I16), "-1 (0xffff)");
        assert_eq!(text(&data, 0, PrimitiveType::U16), "65535 (0xffff)");
        assert_eq!(text(&data, 0, PrimitiveType::I32), "-1 (0xffffffff)");
        assert_eq!(text(&data, 0, PrimitiveType::U32), "4294967295 (0xffffffff)");
        assert_eq!(text(&[0x34, 0x12], 0, PrimitiveType::U16), "4660 (0x1234)");
    }

    #[test]
    fn test_floats_use_distinct_precision() {
        assert_eq!(text(&0.5f32.to_le_bytes(), 0, PrimitiveType::F32), "0.500000");
        assert_eq!(text(&0.5f64.to_le_bytes(), 0, PrimitiveType::F64), "0.5000000000");
    }

    #[test]
    fn test_not_enough_data() {
        let data = [0u8; 3];
        assert_eq!(format_at_offset(&data, 0, PrimitiveType::F32), Readout::NotEnoughData);
        assert_eq!(format_at_offset(&data, 2, PrimitiveType::I16), Readout::NotEnoughData);
        assert_eq!(format_at_offset(&data, 3, PrimitiveType::I8), Readout::NotEnoughData);
        assert_eq!(format_at_offset(&data, 99, PrimitiveType::AsciiString), Readout::NotEnoughData);
        assert_eq!(format_at_offset(&[0u8; 7], 0, PrimitiveType::OleDate), Readout::NotEnoughData);
        assert_eq!(Readout::NotEnoughData.to_string(), "Not enough data");
    }

    #[test]
    fn test_ascii_string() {
        assert_eq!(text(b"ab\x01c\0def", 0, PrimitiveType::AsciiString), "ab.c");
        let long = [b'x'; 40];
        assert_eq!(text(&long, 0, PrimitiveType::AsciiString).len(), MAX_ASCII_CHARS);
        assert_eq!(text(b"\0abc", 0, PrimitiveType::AsciiString), "");
    }

    #[test]
    fn test_unicode_string() {
        assert_eq!(text(b"H\0i\0\x01\x01\0\0Z\0", 0, PrimitiveType::UnicodeString), "Hi.");
        let long: Vec<u8> = std::iter::repeat([b'y', 0]).take(20).flatten().collect();
        assert_eq!(text(&long, 0, PrimitiveType::UnicodeString).len(), MAX_UNICODE_CHARS);
        // odd trailing byte is not a sample
        assert_eq!(text(b"A\0B", 0, PrimitiveType::UnicodeString), "A");
    }

    #[test]
    fn test_unix_times() {
        assert_eq!(text(&0i32.to_le_bytes(), 0, PrimitiveType::Time32), "1970-01-01 00:00:00");
        assert_eq!(
            text(&1_700_000_000i32.to_le_bytes(), 0, PrimitiveType::Time32),
            "2023-11-14 22:13:20"
        );
        assert_eq!(
            text(&4_102_444_800i64.to_le_bytes(), 0, PrimitiveType::Time64),
            "2100-01-01 00:00:00"
        );
        assert_eq!(
            format_at_offset(&i64::MAX.to_le_bytes(), 0, PrimitiveType::Time64),
            Readout::InvalidTime
        );
    }

    #[test]
    fn test_ole_dates() {
        assert_eq!(text(&0.0f64.to_le_bytes(), 0, PrimitiveType::OleDate), "1899-12-30 00:00:00");
        assert_eq!(text(&2.5f64.to_le_bytes(), 0, PrimitiveType::OleDate), "1900-01-01 12:00:00");
        assert_eq!(text(&(-1.25f64).to_le_bytes(), 0, PrimitiveType::OleDate), "1899-12-29 06:00:00");
        assert_eq!(
            format_at_offset(&f64::NAN.to_le_bytes(), 0, PrimitiveType::OleDate),
            Readout::InvalidTime
        );
        assert_eq!(
            format_at_offset(&1e12f64.to_le_bytes(), 0, PrimitiveType::OleDate),
            Readout::InvalidTime
        );
    }

    #[test]
    fn test_ole_date_rounding_stays_in_range() {
        assert_eq!(
            text(&2_958_465.5f64.to_le_bytes(), 0, PrimitiveType::OleDate),
            "9999-12-31 12:00:00"
        );
        // rounds up to 10000-01-01
        assert_eq!(
            format_at_offset(&2_958_465.999_999_9f64.to_le_bytes(), 0, PrimitiveType::OleDate),
            Readout::InvalidTime
        );
    }

    #[test]
    fn test_readout_table() {
        let table = readout_table(&[0x41, 0x00], 0);
        assert_eq!(table.len(), 13);
        assert_eq!(table[0].0.name(), "Byte (8-bit)");
        assert_eq!(table[8].1, Readout::Value("A".to_string()));
        assert_eq!(table[6].1, Readout::NotEnoughData);
    }
}
