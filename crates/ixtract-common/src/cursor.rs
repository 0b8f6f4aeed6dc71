//! Bounds-checked cursor over an immutable byte buffer.
//!
//! [`ByteCursor`] is a position plus a borrowed slice. Every read checks the
//! requested span against the buffer and fails with [`Error::OutOfBounds`]
//! rather than panicking, so callers can abandon a single record and carry on.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use half::f16;
use zerocopy::FromBytes;

use crate::{Error, Result};

/// A cursor that reads typed values out of a byte slice without copying.
///
/// Both byte orders are available. Archive formats of the PS3 era are
/// big-endian, so the decoders mostly use the `_be` variants.
///
/// # Example
///
/// ```
/// use ixtract_common::ByteCursor;
///
/// let data = [0x14, 0x4C, 0x00, 0x00, 0x01, 0x02];
/// let mut cursor = ByteCursor::new(&data);
///
/// assert_eq!(cursor.read_u32_be().unwrap(), 0x144C_0000);
/// assert_eq!(cursor.read_u16_le().unwrap(), 0x0201);
/// assert_eq!(cursor.remaining(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a new cursor at the start of a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a new cursor at an absolute position.
    ///
    /// Fails if `position` lies past the end of the buffer.
    pub fn new_at(data: &'a [u8], position: usize) -> Result<Self> {
        let mut cursor = Self::new(data);
        cursor.seek(position)?;
        Ok(cursor)
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the underlying buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// The whole underlying buffer.
    #[inline]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Seek to an absolute position. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(Error::OutOfBounds {
                offset: position,
                needed: 0,
                available: 0,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Advance the position by a number of bytes, clamped to the buffer end.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count).min(self.data.len());
    }

    /// Skip padding so that the distance from `start` is a multiple of `alignment`.
    ///
    /// Padding that runs off the end of the buffer is clamped; the next read
    /// reports the bounds failure.
    pub fn align_from(&mut self, start: usize, alignment: usize) {
        if alignment == 0 {
            return;
        }
        let used = self.position.saturating_sub(start);
        let remainder = used % alignment;
        if remainder > 0 {
            self.advance(alignment - remainder);
        }
    }

    /// Skip padding up to the next absolute multiple of `alignment`.
    #[inline]
    pub fn align(&mut self, alignment: usize) {
        self.align_from(0, alignment);
    }

    /// Borrow `count` bytes at an absolute offset without moving the cursor.
    pub fn slice_at(&self, offset: usize, count: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(count).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => Err(Error::OutOfBounds {
                offset,
                needed: count,
                available: self.data.len().saturating_sub(offset),
            }),
        }
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        self.slice_at(self.position, count)
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.read_bytes(2).map(LittleEndian::read_u16)
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.read_bytes(4).map(LittleEndian::read_u32)
    }

    /// Read a big-endian u16.
    #[inline]
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.read_bytes(2).map(BigEndian::read_u16)
    }

    /// Read a big-endian u32.
    #[inline]
    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.read_bytes(4).map(BigEndian::read_u32)
    }

    /// Read a big-endian f32.
    #[inline]
    pub fn read_f32_be(&mut self) -> Result<f32> {
        self.read_bytes(4).map(BigEndian::read_f32)
    }

    /// Read a big-endian IEEE half float, widened to f32.
    #[inline]
    pub fn read_f16_be(&mut self) -> Result<f32> {
        self.read_u16_be().map(|bits| f16::from_bits(bits).to_f32())
    }

    /// Read three consecutive big-endian f32 values.
    pub fn read_vec3_be(&mut self) -> Result<[f32; 3]> {
        Ok([self.read_f32_be()?, self.read_f32_be()?, self.read_f32_be()?])
    }

    /// Peek at a big-endian u32 without advancing.
    #[inline]
    pub fn peek_u32_be(&self) -> Result<u32> {
        self.peek_bytes(4).map(BigEndian::read_u32)
    }

    /// Read a null-terminated UTF-8 string and skip its terminator.
    pub fn read_cstring(&mut self) -> Result<&'a str> {
        let start = self.position;
        let rest = &self.data[start.min(self.data.len())..];
        let null_pos =
            memchr::memchr(0, rest).ok_or(Error::MissingNullTerminator(start))?;

        self.position = start + null_pos + 1;
        std::str::from_utf8(&rest[..null_pos]).map_err(Error::Utf8)
    }

    /// Read a struct using zerocopy.
    ///
    /// The struct must implement `FromBytes` from the zerocopy crate.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let offset = self.position;
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::OutOfBounds {
            offset,
            needed: size,
            available: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_both_byte_orders() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x01, 0x02, 0x03, 0x04];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u32_le().unwrap(), 0x04030201);
        assert_eq!(cursor.read_u32_be().unwrap(), 0x01020304);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_read_floats() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&f16::from_f32(0.25).to_bits().to_be_bytes());
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_f32_be().unwrap(), 1.5);
        assert_eq!(cursor.read_f16_be().unwrap(), 0.25);
    }

    #[test]
    fn test_out_of_bounds_reports_offset() {
        let data = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u8().unwrap();

        match cursor.read_u32_be() {
            Err(Error::OutOfBounds {
                offset,
                needed,
                available,
            }) => {
                assert_eq!(offset, 1);
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected OutOfBounds, got {other:?}"),
        }
        // A failed read does not move the cursor.
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 8];
        let mut cursor = ByteCursor::new(&data);

        assert!(cursor.seek(8).is_ok());
        assert!(cursor.seek(9).is_err());
        assert!(ByteCursor::new_at(&data, 9).is_err());
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x17, 0x03, 0x00, 0x00];
        let cursor = ByteCursor::new(&data);

        assert_eq!(cursor.peek_u32_be().unwrap(), 0x1703_0000);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_align_from_start() {
        let data = [0u8; 64];
        let mut cursor = ByteCursor::new_at(&data, 4).unwrap();
        cursor.advance(6);
        cursor.align_from(4, 16);
        assert_eq!(cursor.position(), 20);

        // Already aligned: no movement.
        cursor.align_from(4, 16);
        assert_eq!(cursor.position(), 20);

        cursor.align(16);
        assert_eq!(cursor.position(), 32);
        cursor.align(0);
        assert_eq!(cursor.position(), 32);
    }

    #[test]
    fn test_read_cstring() {
        let data = b"Bip01 Spine\0root\0tail";
        let mut cursor = ByteCursor::new(data);

        assert_eq!(cursor.read_cstring().unwrap(), "Bip01 Spine");
        assert_eq!(cursor.read_cstring().unwrap(), "root");
        assert!(matches!(
            cursor.read_cstring(),
            Err(Error::MissingNullTerminator(17))
        ));
    }

    #[test]
    fn test_slice_at_overflow() {
        let data = [0u8; 4];
        let cursor = ByteCursor::new(&data);

        assert!(cursor.slice_at(2, 2).is_ok());
        assert!(cursor.slice_at(usize::MAX, 2).is_err());
    }
}
