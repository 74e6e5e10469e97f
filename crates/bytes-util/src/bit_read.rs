use std::io;

/// Reads individual bits, most significant bit first, from an [`io::Read`].
///
/// Bytes are pulled from the inner reader lazily, one at a time, so wrapping a
/// reader that strips bytes on the fly (such as an emulation prevention
/// filter) works as expected.
#[derive(Debug)]
#[must_use]
pub struct BitReader<R> {
    inner: R,
    current: u8,
    /// Number of bits of `current` already consumed, 0 means a fresh byte is
    /// needed on the next read.
    consumed: u8,
    bits_read: u64,
}

impl<R> BitReader<R> {
    /// Wraps a reader.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            current: 0,
            consumed: 0,
            bits_read: 0,
        }
    }

    /// Returns `true` when the next bit starts a new byte.
    #[inline]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.consumed == 0
    }

    /// Position inside the current byte, `0..8`.
    #[inline]
    #[must_use]
    pub const fn bit_pos(&self) -> u8 {
        self.consumed
    }

    /// Total number of bits consumed so far.
    #[inline]
    #[must_use]
    pub const fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Borrows the inner reader.
    #[inline]
    #[must_use]
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwraps the inner reader. Any partially consumed byte is lost.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<B: AsRef<[u8]>> BitReader<io::Cursor<B>> {
    /// Creates a reader over an in-memory buffer.
    pub const fn new_from_slice(data: B) -> Self {
        Self::new(io::Cursor::new(data))
    }
}

impl<R: io::Read> BitReader<R> {
    /// Reads one bit.
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.consumed == 0 {
            let mut byte = [0u8; 1];
            self.inner.read_exact(&mut byte)?;
            self.current = byte[0];
        }

        let bit = (self.current >> (7 - self.consumed)) & 1 == 1;
        self.consumed = (self.consumed + 1) % 8;
        self.bits_read += 1;

        Ok(bit)
    }

    /// Reads up to 64 bits into the low bits of the result.
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        if count > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot read {count} bits into a u64"),
            ));
        }

        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u64;
        }

        Ok(value)
    }

    /// Reads a whole byte regardless of alignment.
    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Skips `count` bits.
    pub fn skip_bits(&mut self, count: u64) -> io::Result<()> {
        for _ in 0..count {
            self.read_bit()?;
        }
        Ok(())
    }

    /// Drops the rest of the current byte.
    pub fn align(&mut self) {
        if !self.is_aligned() {
            self.bits_read += (8 - self.consumed) as u64;
            self.consumed = 0;
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let mut reader = BitReader::new_from_slice([0b1010_0110, 0b1111_0000]);

        assert!(reader.read_bit().unwrap());
        assert!(!reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(3).unwrap(), 0b100);
        assert_eq!(reader.bit_pos(), 5);
        assert_eq!(reader.read_bits(7).unwrap(), 0b110_1111);
        assert_eq!(reader.bits_read(), 12);
    }

    #[test]
    fn test_read_u8_unaligned() {
        let mut reader = BitReader::new_from_slice([0b0000_1111, 0b1000_0000]);
        reader.skip_bits(4).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 0b1111_1000);
    }

    #[test]
    fn test_align_skips_partial_byte() {
        let mut reader = BitReader::new_from_slice([0xFF, 0x42]);
        reader.read_bits(3).unwrap();
        reader.align();
        assert!(reader.is_aligned());
        assert_eq!(reader.bits_read(), 8);
        assert_eq!(reader.read_u8().unwrap(), 0x42);
    }

    #[test]
    fn test_eof_is_reported() {
        let mut reader = BitReader::new_from_slice([0x01]);
        reader.read_bits(8).unwrap();
        let err = reader.read_bit().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_too_many_bits() {
        let mut reader = BitReader::new_from_slice([0u8; 16]);
        let err = reader.read_bits(65).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
