use std::io;

/// Strips (when reading) or inserts (when writing) the `0x03` emulation
/// prevention byte that follows two zero bytes in a NAL unit payload,
/// ISO/IEC 14496-10 clause 7.4.1.
///
/// Works one byte at a time, so the inner reader or writer should be
/// in-memory or buffered.
pub struct EmulationPreventionIo<I> {
    inner: I,
    zeros: u8,
}

impl<I> EmulationPreventionIo<I> {
    /// Wraps a reader or writer.
    pub fn new(inner: I) -> Self {
        Self { inner, zeros: 0 }
    }

    /// Unwraps the inner reader or writer.
    pub fn into_inner(self) -> I {
        self.inner
    }

    fn track(&mut self, byte: u8) {
        self.zeros = if byte == 0 {
            self.zeros.saturating_add(1)
        } else {
            0
        };
    }
}

impl<I: io::Read> io::Read for EmulationPreventionIo<I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        let mut byte = [0u8; 1];

        while filled < buf.len() {
            if self.inner.read(&mut byte)? == 0 {
                break;
            }

            if byte[0] == 0x03 && self.zeros >= 2 {
                self.zeros = 0;
                continue;
            }

            self.track(byte[0]);
            buf[filled] = byte[0];
            filled += 1;
        }

        Ok(filled)
    }
}

impl<I: io::Write> io::Write for EmulationPreventionIo<I> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if self.zeros >= 2 && byte <= 0x03 {
                self.inner.write_all(&[0x03])?;
                self.zeros = 0;
            }

            self.inner.write_all(&[byte])?;
            self.track(byte);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
