//! Bounds-checked little-endian reads over an immutable buffer.
//!
//! Every read takes an absolute offset into the original buffer and
//! leaves no state behind, so several decode attempts can look at the same
//! bytes without stepping on each other.
use byteordered::ByteOrdered;

use crate::error::DecodeError;

#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
}

macro_rules! impl_read {
    ($($(#[$meta:meta])* $name:ident => $ty:ty, $width:expr;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self, offset: usize) -> Result<$ty, DecodeError> {
                ByteOrdered::le(self.slice(offset, $width)?)
                    .$name()
                    .map_err(|_| self.out_of_bounds(offset, $width))
            }
        )*
    };
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteCursor { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// Fails with [`DecodeError::OutOfBounds`] when the range is not
    /// entirely inside the buffer (including on `offset + len` overflow).
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.out_of_bounds(offset, len))?;
        Ok(&self.bytes[offset..end])
    }

    /// Everything from `offset` to the end of the buffer.
    pub fn tail(&self, offset: usize) -> Result<&'a [u8], DecodeError> {
        if offset > self.bytes.len() {
            return Err(self.out_of_bounds(offset, 0));
        }
        Ok(&self.bytes[offset..])
    }

    impl_read! {
        read_u8 => u8, 1;
        read_u16 => u16, 2;
        read_u32 => u32, 4;
        read_i64 => i64, 8;
        read_f32 => f32, 4;
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            offset,
            len,
            available: self.bytes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x80, 0x3f];
        let cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_u8(0).unwrap(), 0x01);
        assert_eq!(cursor.read_u16(0).unwrap(), 0x0201);
        assert_eq!(cursor.read_u32(0).unwrap(), 0x0403_0201);
        assert_eq!(cursor.read_f32(4).unwrap(), 1.0);
        assert_eq!(cursor.read_i64(0).unwrap(), 0x3f80_0000_0403_0201);
    }

    #[test]
    fn rereading_is_stable() {
        let bytes = [7u8, 0, 0, 0];
        let cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_u32(0).unwrap(), 7);
        assert_eq!(cursor.read_u32(0).unwrap(), 7);
    }

    #[test]
    fn reads_past_end_fail() {
        let bytes = [0u8; 4];
        let cursor = ByteCursor::new(&bytes);
        assert!(cursor.read_u32(0).is_ok());
        match cursor.read_u32(1) {
            Err(DecodeError::OutOfBounds {
                offset: 1,
                len: 4,
                available: 4,
            }) => {}
            other => panic!("unexpected: {:?}", other),
        }
        assert!(cursor.read_u8(4).is_err());
        assert!(cursor.read_i64(0).is_err());
        assert!(cursor.slice(usize::MAX, 2).is_err());
        assert_eq!(cursor.slice(4, 0).unwrap(), &[] as &[u8]);
        assert!(cursor.tail(5).is_err());
    }
}
