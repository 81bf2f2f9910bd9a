//! Low-level field encoding for `.hva` files.
//!
//! Every field is one of:
//! - a fixed-width little-endian `int32`
//! - a fixed-size byte array (signature, reserved block)
//! - a length-prefixed byte string: `int32` length, then that many raw bytes
//!   with no terminator
//!
//! There is no padding between fields.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Cursor over an `.hva` byte buffer that tracks its absolute position for
/// error reporting
#[derive(Debug)]
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    /// Absolute offset of the next unread byte
    pub(crate) fn position(&self) -> usize {
        self.total - self.buf.remaining()
    }

    fn require(&self, needed: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(Error::truncated(
                self.position(),
                format!(
                    "need {} bytes for {}, have {}",
                    needed,
                    what,
                    self.buf.remaining()
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        self.require(N, what)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    pub(crate) fn read_i32(&mut self, what: &str) -> Result<i32> {
        self.require(4, what)?;
        Ok(self.buf.get_i32_le())
    }

    /// Reads an `int32` length followed by that many bytes
    pub(crate) fn read_len_prefixed(&mut self, what: &str) -> Result<Vec<u8>> {
        let at = self.position();
        let len = self.read_i32(what)?;
        let len = usize::try_from(len)
            .map_err(|_| Error::truncated(at, format!("negative length {} for {}", len, what)))?;
        self.require(len, what)?;

        let mut out = vec![0u8; len];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Reads a length-prefixed byte string without decoding it
    pub(crate) fn read_bytes(&mut self, what: &str) -> Result<Bytes> {
        self.read_len_prefixed(what).map(Bytes::from)
    }
}

/// Converts a size or offset to the `int32` the format stores
pub(crate) fn to_i32(value: usize, field: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::OffsetOverflow { field, value })
}

/// Appends an `int32` length followed by the raw bytes
pub(crate) fn put_len_prefixed(buf: &mut BytesMut, bytes: &[u8], field: &'static str) -> Result<()> {
    buf.put_i32_le(to_i32(bytes.len(), field)?);
    buf.put_slice(bytes);
    Ok(())
}
