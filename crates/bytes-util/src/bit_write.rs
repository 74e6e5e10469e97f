use std::io;

/// Writes individual bits, most significant bit first, into an [`io::Write`].
///
/// Mostly used to build H.264 parameter sets and slice headers in tests.
#[derive(Debug)]
#[must_use]
pub struct BitWriter<W> {
    inner: W,
    pending: u8,
    filled: u8,
}

impl<W: Default> Default for BitWriter<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}

impl<W> BitWriter<W> {
    /// Wraps a writer.
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            pending: 0,
            filled: 0,
        }
    }

    /// Returns `true` when no partial byte is pending.
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.filled == 0
    }
}

impl<W: io::Write> BitWriter<W> {
    /// Writes one bit.
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.pending |= (bit as u8) << (7 - self.filled);
        self.filled += 1;

        if self.filled == 8 {
            self.inner.write_all(&[self.pending])?;
            self.pending = 0;
            self.filled = 0;
        }

        Ok(())
    }

    /// Writes the low `count` bits of `value`.
    pub fn write_bits(&mut self, value: u64, count: u8) -> io::Result<()> {
        if count > 64 || (count < 64 && value >> count != 0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{value} does not fit in {count} bits"),
            ));
        }

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1)?;
        }

        Ok(())
    }

    /// Pads the current byte with zero bits.
    pub fn align(&mut self) -> io::Result<()> {
        while !self.is_aligned() {
            self.write_bit(false)?;
        }
        Ok(())
    }

    /// Aligns and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.align()?;
        Ok(self.inner)
    }
}
